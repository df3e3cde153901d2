/// Split text into lowercase tokens made of Unicode letters and digits.
///
/// Every run of other characters is a separator. Case folding happens inside the
/// same scan, so a token produced here is reproduced unchanged when fed back in.
/// Build time and query time both go through this function.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        assert_eq!(tokenize("Hello, World! 123"), vec!["hello", "world", "123"]);
    }

    #[test]
    fn empty_and_separator_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" ,.;-- !").is_empty());
    }

    #[test]
    fn digits_and_letters_stay_together() {
        assert_eq!(tokenize("U.S.-bound F16s"), vec!["u", "s", "bound", "f16s"]);
    }
}
