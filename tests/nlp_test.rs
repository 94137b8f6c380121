use bank_reviews::nlp::{english_stop_words, tokenize, TextCleaner};

#[test]
fn test_text_cleaner_creation() {
    assert!(TextCleaner::new().is_ok());
}

#[test]
fn test_clean_review_text() {
    let cleaner = TextCleaner::new().expect("Failed to create text cleaner");

    assert_eq!(
        cleaner.clean("App crashed 3 times!! See http://bit.ly/x"),
        "app crashed times see"
    );
    assert_eq!(cleaner.clean("user-friendly & simple"), "user friendly simple");
    assert_eq!(cleaner.clean("   "), "");
}

#[test]
fn test_clean_keeps_non_latin_words() {
    let cleaner = TextCleaner::new().expect("Failed to create text cleaner");
    assert_eq!(cleaner.clean("በጣም ጥሩ!"), "በጣም ጥሩ");
}

#[test]
fn test_clean_is_idempotent() {
    let cleaner = TextCleaner::new().expect("Failed to create text cleaner");
    let once = cleaner.clean("Login ERROR: code 503, try again...");
    assert_eq!(cleaner.clean(&once), once);
}

#[test]
fn test_english_stop_words() {
    let stop_words = english_stop_words();
    assert!(stop_words.contains("the"));
    assert!(stop_words.contains("and"));
    assert!(!stop_words.contains("transfer"));
}

#[test]
fn test_tokenize_with_stop_words() {
    let stop_words = english_stop_words();
    let tokens = tokenize("the transfer is stuck and pending", &stop_words, 3);
    assert_eq!(tokens, vec!["transfer", "stuck", "pending"]);
}
