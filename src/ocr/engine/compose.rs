use crate::ocr::Token;

/// Final token list: 0° survivors first, then 90° survivors, numbered `0..n`.
pub fn compose(horizontal: Vec<Token>, vertical: Vec<Token>) -> Vec<Token> {
    horizontal
        .into_iter()
        .chain(vertical)
        .enumerate()
        .map(|(id, token)| Token { id, ..token })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{BBoxPx, Orientation};

    #[test]
    fn ids_follow_concatenation_order() {
        let mut stale = Token::new("9", BBoxPx::new(0, 0, 5, 5), 70, Orientation::Deg0);
        stale.id = 41;
        let out = compose(
            vec![stale, Token::new("8", BBoxPx::new(50, 0, 5, 5), 70, Orientation::Deg0)],
            vec![Token::new("7", BBoxPx::new(0, 0, 5, 9), 70, Orientation::Deg90)],
        );
        let summary: Vec<(usize, &str)> = out.iter().map(|t| (t.id, t.text.as_str())).collect();
        assert_eq!(summary, vec![(0, "9"), (1, "8"), (2, "7")]);
    }
}
