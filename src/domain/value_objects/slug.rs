//! URL slugs for categories and threads.

/// Build a lowercase, dash separated slug.
///
/// Latin accents are folded to ASCII (`"Jugadores y Cuerpo Técnico"` becomes
/// `"jugadores-y-cuerpo-tecnico"`). Everything that is not an ASCII letter or
/// digit acts as a separator. Returns `fallback` when nothing is left.
pub fn slugify(input: &str, fallback: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    let mut buf = [0u8; 4];

    for c in input.chars() {
        let folded: &str = match fold_char(c) {
            Some(ascii) => ascii,
            None => c.encode_utf8(&mut buf),
        };

        for ch in folded.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(ch.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
    }

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Slug for the n-th collision: `base`, `base-2`, `base-3`, ...
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => "a",
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => "e",
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => "i",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => "o",
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => "u",
        'ñ' | 'Ñ' => "n",
        'ç' | 'Ç' => "c",
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        '&' => " and ",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Noticias y Anuncios", "noticias-y-anuncios")]
    #[test_case("Jugadores y Cuerpo Técnico", "jugadores-y-cuerpo-tecnico")]
    #[test_case("¡Bienvenidos a RiverForo.com!", "bienvenidos-a-riverforo-com")]
    #[test_case("  Campeón   de  América  ", "campeon-de-america")]
    #[test_case("Año 2018 -- Madrid", "ano-2018-madrid")]
    fn test_slugify(input: &str, expected: &str) {
        assert_eq!(slugify(input, "thread"), expected);
    }

    #[test]
    fn test_slugify_fallback_when_empty() {
        assert_eq!(slugify("!!!", "thread"), "thread");
        assert_eq!(slugify("", "category"), "category");
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("superclasico", 1), "superclasico");
        assert_eq!(with_suffix("superclasico", 2), "superclasico-2");
        assert_eq!(with_suffix("superclasico", 3), "superclasico-3");
    }
}
