//! Unsupervised topic modeling.
//!
//! Two models with the same purpose:
//!
//! - [`CorpusTopicModel`] fits LDA over the whole corpus. Tokens go through a
//!   [`Dictionary`] (stop words, short tokens and extreme document
//!   frequencies removed) into a bag-of-words corpus that a collapsed Gibbs
//!   sampler trains on.
//! - [`BankTopicModeler`] fits one model per bank. Each bank's reviews are
//!   TF-IDF vectorized and decomposed into topics with a seeded EM
//!   factorization; banks without enough reviews are skipped.
//!
//! Both only produce human-readable reports.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{AnalyzedReview, TopicSummary};
use crate::nlp::tokenize;
use crate::tfidf::{TfidfMatrix, TfidfVectorizer};

/// Words listed per topic line of the per-bank report
const BANK_REPORT_WORDS: usize = 8;

/// Token pattern of the per-bank vectorizer: alphabetic words of 3+ letters
const BANK_TOKEN_PATTERN: &str = r"\b[a-zA-Z]{3,}\b";

/// Bag-of-words document: `(token id, count)` sorted by id
pub type BowDocument = Vec<(usize, usize)>;

/// Token id mapping with document frequencies
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    token2id: HashMap<String, usize>,
    id2token: Vec<String>,
    dfs: Vec<usize>,
    num_docs: usize,
}

impl Dictionary {
    /// Assign ids to tokens in first-seen order
    #[must_use]
    pub fn from_documents(documents: &[Vec<String>]) -> Self {
        let mut dictionary = Self::default();

        for doc in documents {
            dictionary.num_docs += 1;
            let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for token in doc {
                if !dictionary.token2id.contains_key(token) {
                    dictionary.token2id.insert(token.clone(), dictionary.id2token.len());
                    dictionary.id2token.push(token.clone());
                    dictionary.dfs.push(0);
                }
            }
            for token in unique {
                if let Some(&id) = dictionary.token2id.get(token) {
                    dictionary.dfs[id] += 1;
                }
            }
        }

        dictionary
    }

    /// Drop tokens found in fewer than `no_below` documents or in more than
    /// `no_above` of them, then compact the ids.
    pub fn filter_extremes(&mut self, no_below: usize, no_above: f64) {
        // Whole documents only, as a fraction of the corpus rounded down
        let no_above_abs = (no_above * self.num_docs as f64).floor() as usize;
        let before = self.id2token.len();

        let kept: Vec<(String, usize)> = self
            .id2token
            .iter()
            .zip(&self.dfs)
            .filter(|(_, &df)| df >= no_below && df <= no_above_abs)
            .map(|(token, &df)| (token.clone(), df))
            .collect();

        self.token2id.clear();
        self.id2token.clear();
        self.dfs.clear();
        for (id, (token, df)) in kept.into_iter().enumerate() {
            self.token2id.insert(token.clone(), id);
            self.id2token.push(token);
            self.dfs.push(df);
        }

        debug!(
            "Dictionary filtered from {} to {} tokens (no_below={}, no_above={})",
            before,
            self.id2token.len(),
            no_below,
            no_above
        );
    }

    /// Count known tokens of one document
    #[must_use]
    pub fn doc2bow(&self, tokens: &[String]) -> BowDocument {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.token2id.get(token) {
                *counts.entry(id).or_default() += 1;
            }
        }

        let mut bow: BowDocument = counts.into_iter().collect();
        bow.sort_unstable();
        bow
    }

    /// Number of tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    /// True when no token survived
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }

    /// Token for an id
    #[must_use]
    pub fn token(&self, id: usize) -> Option<&str> {
        self.id2token.get(id).map(String::as_str)
    }

    /// Number of documents containing the token
    #[must_use]
    pub fn doc_freq(&self, token: &str) -> Option<usize> {
        self.token2id.get(token).map(|&id| self.dfs[id])
    }
}

/// Hyper-parameters of the Gibbs sampler
#[derive(Debug, Clone, Copy)]
pub struct LdaParams {
    /// Number of topics
    pub num_topics: usize,
    /// Sweeps over every token of the corpus
    pub passes: usize,
    /// Document-topic prior; `None` means `1 / num_topics`
    pub alpha: Option<f64>,
    /// Topic-word prior
    pub beta: f64,
    /// Sampler seed
    pub seed: u64,
}

impl Default for LdaParams {
    fn default() -> Self {
        Self {
            num_topics: 4,
            passes: 10,
            alpha: None,
            beta: 0.01,
            seed: 42,
        }
    }
}

/// Latent Dirichlet Allocation trained by collapsed Gibbs sampling
#[derive(Debug, Clone)]
pub struct LdaModel {
    num_topics: usize,
    num_words: usize,
    beta: f64,
    // [topic][word]: tokens of word assigned to topic
    nkw: Vec<Vec<usize>>,
    // [topic]: tokens assigned to topic
    nk: Vec<usize>,
}

impl LdaModel {
    /// Train on a bag-of-words corpus over `num_words` token ids
    pub fn train(corpus: &[BowDocument], num_words: usize, params: &LdaParams) -> Result<Self> {
        let k = params.num_topics;
        if k == 0 {
            return Err(PipelineError::InvalidConfig("num_topics must be greater than 0".to_string()));
        }
        if num_words == 0 {
            return Err(PipelineError::Vectorizer("cannot train LDA on an empty dictionary".to_string()));
        }

        let alpha = params.alpha.unwrap_or(1.0 / k as f64);
        let beta = params.beta;
        let vb = num_words as f64 * beta;

        // Expand counts into token positions
        let docs: Vec<Vec<usize>> = corpus
            .iter()
            .map(|bow| {
                bow.iter()
                    .flat_map(|&(word, count)| std::iter::repeat(word).take(count))
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut ndk = vec![vec![0_usize; k]; docs.len()];
        let mut nkw = vec![vec![0_usize; num_words]; k];
        let mut nk = vec![0_usize; k];
        let mut z: Vec<Vec<usize>> = Vec::with_capacity(docs.len());

        for (d, doc) in docs.iter().enumerate() {
            let mut assignments = Vec::with_capacity(doc.len());
            for &w in doc {
                let topic = rng.gen_range(0..k);
                assignments.push(topic);
                ndk[d][topic] += 1;
                nkw[topic][w] += 1;
                nk[topic] += 1;
            }
            z.push(assignments);
        }

        let mut weights = vec![0.0_f64; k];
        for pass in 0..params.passes {
            for (d, doc) in docs.iter().enumerate() {
                for (i, &w) in doc.iter().enumerate() {
                    let old = z[d][i];
                    ndk[d][old] -= 1;
                    nkw[old][w] -= 1;
                    nk[old] -= 1;

                    // p(t) ∝ (ndk[d][t] + α) · (nkw[t][w] + β) / (nk[t] + Vβ)
                    let mut total = 0.0;
                    for (t, weight) in weights.iter_mut().enumerate() {
                        *weight = (ndk[d][t] as f64 + alpha) * (nkw[t][w] as f64 + beta) / (nk[t] as f64 + vb);
                        total += *weight;
                    }

                    let new = sample_index(&weights, total, &mut rng);
                    z[d][i] = new;
                    ndk[d][new] += 1;
                    nkw[new][w] += 1;
                    nk[new] += 1;
                }
            }
            debug!("LDA pass {}/{} complete", pass + 1, params.passes);
        }

        Ok(Self {
            num_topics: k,
            num_words,
            beta,
            nkw,
            nk,
        })
    }

    /// Number of topics
    #[must_use]
    pub const fn num_topics(&self) -> usize {
        self.num_topics
    }

    /// Heaviest `n` words of a topic by φ[t][w]
    #[must_use]
    pub fn top_words(&self, topic: usize, n: usize) -> Vec<(usize, f64)> {
        let denom = self.nk[topic] as f64 + self.num_words as f64 * self.beta;
        let mut pairs: Vec<(usize, f64)> = self.nkw[topic]
            .iter()
            .enumerate()
            .map(|(w, &count)| (w, (count as f64 + self.beta) / denom))
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        pairs.truncate(n);
        pairs
    }
}

fn sample_index(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    if total <= f64::EPSILON {
        return rng.gen_range(0..weights.len());
    }

    let mut target = rng.gen::<f64>() * total;
    for (i, weight) in weights.iter().enumerate() {
        target -= weight;
        if target <= 0.0 {
            return i;
        }
    }
    weights.len() - 1
}

/// Settings of the whole-corpus model
#[derive(Debug, Clone)]
pub struct CorpusTopicConfig {
    /// Sampler settings
    pub lda: LdaParams,
    /// Words reported per topic
    pub words_per_topic: usize,
    /// Dictionary keeps tokens found in at least this many documents
    pub no_below: usize,
    /// Dictionary keeps tokens found in at most this share of documents
    pub no_above: f64,
    /// Shortest token kept
    pub min_token_len: usize,
}

impl Default for CorpusTopicConfig {
    fn default() -> Self {
        Self {
            lda: LdaParams::default(),
            words_per_topic: 10,
            no_below: 5,
            no_above: 0.5,
            min_token_len: 3,
        }
    }
}

/// LDA over every review in the corpus
#[derive(Debug, Clone)]
pub struct CorpusTopicModel {
    config: CorpusTopicConfig,
    stop_words: HashSet<String>,
}

impl CorpusTopicModel {
    /// Create a model that filters `stop_words` before building the dictionary
    #[must_use]
    pub const fn new(config: CorpusTopicConfig, stop_words: HashSet<String>) -> Self {
        Self { config, stop_words }
    }

    /// Fit on cleaned review texts and return each topic's top words
    pub fn fit<S: AsRef<str>>(&self, cleaned_documents: &[S]) -> Result<Vec<TopicSummary>> {
        info!("Starting LDA topic modeling ({} topics)", self.config.lda.num_topics);

        let tokenized: Vec<Vec<String>> = cleaned_documents
            .iter()
            .map(|doc| tokenize(doc.as_ref(), &self.stop_words, self.config.min_token_len))
            .collect();

        let mut dictionary = Dictionary::from_documents(&tokenized);
        dictionary.filter_extremes(self.config.no_below, self.config.no_above);
        if dictionary.is_empty() {
            return Err(PipelineError::Vectorizer(
                "no tokens survive dictionary filtering; the corpus is too small for LDA".to_string(),
            ));
        }

        let corpus: Vec<BowDocument> = tokenized.iter().map(|tokens| dictionary.doc2bow(tokens)).collect();
        let model = LdaModel::train(&corpus, dictionary.len(), &self.config.lda)?;

        let topics = (0..model.num_topics())
            .map(|topic| TopicSummary {
                index: topic,
                words: model
                    .top_words(topic, self.config.words_per_topic)
                    .into_iter()
                    .filter_map(|(id, weight)| dictionary.token(id).map(|token| (token.to_string(), weight)))
                    .collect(),
            })
            .collect();

        info!("LDA modeling complete.");
        Ok(topics)
    }

    /// Fit and render the report in one step
    pub fn run<S: AsRef<str>>(&self, cleaned_documents: &[S]) -> Result<String> {
        Ok(format_corpus_report(&self.fit(cleaned_documents)?))
    }
}

/// Render corpus topics as `--- Topic n ---` blocks
#[must_use]
pub fn format_corpus_report(topics: &[TopicSummary]) -> String {
    topics
        .iter()
        .map(|topic| {
            let mut block = format!("--- Topic {} ---\n", topic.index + 1);
            for (word, weight) in &topic.words {
                let _ = writeln!(block, "{word:15}  weight={weight:.4}");
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Seeded EM factorization of a weighted document-term matrix.
///
/// Each document is a mixture of topics and each topic a distribution over
/// terms; responsibilities are re-estimated from the TF-IDF weights on every
/// iteration.
#[derive(Debug, Clone)]
pub struct TopicDecomposition {
    n_topics: usize,
    max_iter: usize,
    seed: u64,
}

impl TopicDecomposition {
    /// Create a decomposition into `n_topics` components
    #[must_use]
    pub const fn new(n_topics: usize, max_iter: usize, seed: u64) -> Self {
        Self {
            n_topics,
            max_iter,
            seed,
        }
    }

    /// Fit and return the topic-term pseudo-counts (`n_topics` × `n_terms`)
    pub fn fit(&self, matrix: &TfidfMatrix) -> Result<Vec<Vec<f64>>> {
        let (n_docs, n_terms, k) = (matrix.n_docs(), matrix.n_features(), self.n_topics);
        if n_docs == 0 || n_terms == 0 || k == 0 {
            return Err(PipelineError::Vectorizer(
                "document-term matrix and topic count must be non-empty".to_string(),
            ));
        }

        let doc_topic_prior = 1.0 / k as f64;
        let topic_word_prior = 1.0 / k as f64;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut doc_topic: Vec<Vec<f64>> = (0..n_docs)
            .map(|_| (0..k).map(|_| doc_topic_prior + rng.gen::<f64>() * 0.01).collect())
            .collect();
        let mut topic_word: Vec<Vec<f64>> = (0..k)
            .map(|_| (0..n_terms).map(|_| 1.0 + rng.gen::<f64>()).collect())
            .collect();
        normalize_rows(&mut doc_topic);
        normalize_rows(&mut topic_word);

        let mut components = topic_word.clone();
        let mut responsibilities = vec![0.0_f64; k];

        for _ in 0..self.max_iter {
            let mut new_doc_topic = vec![vec![doc_topic_prior; k]; n_docs];
            let mut new_topic_word = vec![vec![topic_word_prior; n_terms]; k];

            for (d, row) in matrix.rows().enumerate() {
                for &(v, weight) in row {
                    let mut sum = 0.0;
                    for (t, r) in responsibilities.iter_mut().enumerate() {
                        *r = doc_topic[d][t] * topic_word[t][v];
                        sum += *r;
                    }
                    if sum <= 1e-12 {
                        continue;
                    }
                    for (t, r) in responsibilities.iter().enumerate() {
                        let share = weight * r / sum;
                        new_doc_topic[d][t] += share;
                        new_topic_word[t][v] += share;
                    }
                }
            }

            components.clone_from(&new_topic_word);
            normalize_rows(&mut new_doc_topic);
            normalize_rows(&mut new_topic_word);
            doc_topic = new_doc_topic;
            topic_word = new_topic_word;
        }

        Ok(components)
    }
}

fn normalize_rows(rows: &mut [Vec<f64>]) {
    for row in rows {
        let sum: f64 = row.iter().sum();
        if sum > 0.0 {
            for value in row.iter_mut() {
                *value /= sum;
            }
        }
    }
}

/// Settings of the per-bank model
#[derive(Debug, Clone)]
pub struct BankTopicConfig {
    /// Components per bank
    pub n_topics: usize,
    /// Ranked words kept per topic
    pub top_n: usize,
    /// Banks with fewer qualifying reviews are skipped
    pub min_docs: usize,
    /// Cleaned reviews must be longer than this to qualify
    pub min_chars: usize,
    /// Vocabulary cap
    pub max_features: usize,
    /// EM iterations
    pub max_iter: usize,
    /// Decomposition seed
    pub seed: u64,
}

impl Default for BankTopicConfig {
    fn default() -> Self {
        Self {
            n_topics: 4,
            top_n: 12,
            min_docs: 50,
            min_chars: 10,
            max_features: 800,
            max_iter: 10,
            seed: 42,
        }
    }
}

/// Topic modeling outcome for one bank
#[derive(Debug, Clone)]
pub struct BankTopics {
    /// Bank name
    pub bank_name: String,
    /// Reviews long enough to be modeled
    pub doc_count: usize,
    /// `None` when the bank had too little data
    pub topics: Option<Vec<TopicSummary>>,
}

/// LDA fitted separately for every bank
#[derive(Debug, Clone)]
pub struct BankTopicModeler {
    config: BankTopicConfig,
    stop_words: HashSet<String>,
}

impl BankTopicModeler {
    /// Create a modeler using `stop_words` in its vectorizer
    #[must_use]
    pub const fn new(config: BankTopicConfig, stop_words: HashSet<String>) -> Self {
        Self { config, stop_words }
    }

    /// Topics of one bank's cleaned documents, or `None` below the threshold
    pub fn topics_for_subset<S: AsRef<str>>(&self, docs: &[S]) -> Result<Option<Vec<TopicSummary>>> {
        if docs.len() < self.config.min_docs {
            return Ok(None);
        }

        let matrix = TfidfVectorizer::new()?
            .with_max_df(0.85)
            .with_min_df(3)
            .with_ngram_range(1, 2)
            .with_stop_words(self.stop_words.clone())
            .with_max_features(self.config.max_features)
            .with_token_pattern(BANK_TOKEN_PATTERN)?
            .fit_transform(docs)?;

        let components =
            TopicDecomposition::new(self.config.n_topics, self.config.max_iter, self.config.seed).fit(&matrix)?;

        let feature_names = matrix.feature_names();
        let topics = components
            .iter()
            .enumerate()
            .map(|(index, component)| {
                let mut ranked: Vec<(usize, f64)> = component.iter().copied().enumerate().collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                TopicSummary {
                    index,
                    words: ranked
                        .into_iter()
                        .take(self.config.top_n)
                        .map(|(col, weight)| (feature_names[col].clone(), weight))
                        .collect(),
                }
            })
            .collect();

        Ok(Some(topics))
    }

    /// Model every bank in order of first appearance
    pub fn fit(&self, reviews: &[AnalyzedReview]) -> Vec<BankTopics> {
        let mut order: Vec<&str> = Vec::new();
        let mut docs_by_bank: HashMap<&str, Vec<&str>> = HashMap::new();

        for review in reviews {
            let bank = review.record.bank_name.as_str();
            let docs = docs_by_bank.entry(bank).or_insert_with(|| {
                order.push(bank);
                Vec::new()
            });
            if review.cleaned_review.chars().count() > self.config.min_chars {
                docs.push(review.cleaned_review.as_str());
            }
        }

        order
            .into_iter()
            .map(|bank| {
                let docs = docs_by_bank.remove(bank).unwrap_or_default();
                let topics = match self.topics_for_subset(&docs) {
                    Ok(topics) => topics,
                    Err(e) => {
                        warn!("Topic modeling failed for {}: {}", bank, e);
                        None
                    }
                };
                BankTopics {
                    bank_name: bank.to_string(),
                    doc_count: docs.len(),
                    topics,
                }
            })
            .collect()
    }

    /// Fit every bank and render the report
    pub fn run(&self, reviews: &[AnalyzedReview]) -> String {
        format_bank_report(&self.fit(reviews))
    }
}

/// Render per-bank topics, listing the top words of each topic
#[must_use]
pub fn format_bank_report(banks: &[BankTopics]) -> String {
    let mut output = Vec::new();

    for bank in banks {
        output.push(format!("\n=== {} ({} reviews) ===", bank.bank_name, bank.doc_count));

        let Some(topics) = &bank.topics else {
            output.push("Insufficient data for reliable LDA modeling.".to_string());
            continue;
        };

        for topic in topics {
            let words: Vec<&str> = topic
                .words
                .iter()
                .take(BANK_REPORT_WORDS)
                .map(|(word, _)| word.as_str())
                .collect();
            output.push(format!("Topic {}: {}", topic.index + 1, words.join(", ")));
        }
    }

    output.join("\n")
}
