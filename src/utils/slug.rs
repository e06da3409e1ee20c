pub fn to_slug(val: &str) -> String {
    val.trim()
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::to_slug;

    #[test]
    fn slug_drops_punctuation_and_collapses_spaces() {
        assert_eq!(to_slug("  Flood Relief:  Kerala 2024! "), "flood-relief-kerala-2024");
    }
}
