use tokenizers::{normalizers::BertNormalizer, pre_tokenizers::bert::BertPreTokenizer, NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

/// Clean control characters, strip accents and lowercase.
/// `"DESCRIPCIÓN MOVIMIENTO"` becomes `"descripcion movimiento"`.
pub(crate) fn normalise(text: &str) -> String {
    let normaliser = BertNormalizer::new(true, true, None, true);
    let mut normalised = NormalizedString::from(text);
    match normaliser.normalize(&mut normalised) {
        Ok(()) => normalised.get().to_string(),
        Err(_) => text.to_lowercase(),
    }
}

pub(crate) fn tokenise(text: &str) -> Vec<String> {
    let normalised = normalise(text);

    let pre_tokenizer = BertPreTokenizer {};
    let mut pre_tokenized = PreTokenizedString::from(normalised.as_str());
    if pre_tokenizer.pre_tokenize(&mut pre_tokenized).is_err() {
        return normalised.split_whitespace().filter(|s| !is_ignored(s)).map(str::to_string).collect();
    }

    pre_tokenized.get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .filter_map(|s| {
            if is_ignored(s.0) {
                None
            } else {
                Some(s.0.to_string())
            }
        })
        .collect()
}

/// Punctuation-only tokens such as `*`, `-` or `/` carry no meaning for classification
fn is_ignored(token: &str) -> bool {
    !token.chars().any(char::is_alphanumeric)
}

/// Contiguous n-grams for every n in `min..=max`, joined by a single space.
/// Unigrams come first, then bigrams, and so on.
pub(crate) fn ngrams(tokens: &[String], min: usize, max: usize) -> Vec<String> {
    let min = min.max(1);
    let mut terms = vec![];
    for n in min..=max {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}
