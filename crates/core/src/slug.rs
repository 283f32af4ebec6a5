//! URL-safe slug derivation for the catalog's `link_rewrite` column.
//!
//! The slug is derived from the *translated* title whenever the title was
//! part of the generated output, independent of whether `link_rewrite` was
//! itself a requested field.

/// Derive a lowercase, dash-separated, ASCII-only slug from a title.
///
/// Common Latin diacritics are folded to their base letters; anything else
/// outside `[a-z0-9]` becomes a separator. Consecutive separators collapse.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        for folded in fold_char(ch) {
            if folded.is_ascii_alphanumeric() {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(folded.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
    }

    out
}

/// Fold a character to zero or more ASCII characters.
fn fold_char(ch: char) -> Vec<char> {
    match ch {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' | 'À' | 'Á' | 'Â' | 'Ä' | 'Ã' | 'Å' => vec!['a'],
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => vec!['e'],
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => vec!['i'],
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' | 'Ò' | 'Ó' | 'Ô' | 'Ö' | 'Õ' => vec!['o'],
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => vec!['u'],
        'ç' | 'Ç' => vec!['c'],
        'ñ' | 'Ñ' => vec!['n'],
        'ý' | 'ÿ' | 'Ý' => vec!['y'],
        'ß' => vec!['s', 's'],
        'æ' | 'Æ' => vec!['a', 'e'],
        'œ' | 'Œ' => vec!['o', 'e'],
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_title() {
        assert_eq!(slugify("Wooden Chair"), "wooden-chair");
    }

    #[test]
    fn diacritics_are_folded() {
        assert_eq!(slugify("Chaise en châtaignier"), "chaise-en-chataignier");
        assert_eq!(slugify("Größe"), "grosse");
    }

    #[test]
    fn punctuation_collapses_to_single_dash() {
        assert_eq!(slugify("Chair -- 2nd (Edition)!"), "chair-2nd-edition");
    }

    #[test]
    fn leading_and_trailing_separators_are_dropped() {
        assert_eq!(slugify("  ¡Hola!  "), "hola");
    }

    #[test]
    fn non_latin_input_yields_empty_slug() {
        assert_eq!(slugify("只有中文"), "");
    }
}
