//! City name normalisation for the same-city heuristic
//!
//! Customers and catalog rows spell cities differently ("Варна", "Varna",
//! "гр. Варна", "VARNA"). Names are folded to a lowercase ASCII form so they
//! can be compared directly.

/// Leading tokens that mark a locality rather than name it
const LOCALITY_PREFIXES: &[&[&str]] = &[
    &["city", "of"],
    &["grad"],
    &["gr"],
    &["selo"],
    &["s"],
    &["town"],
    &["village"],
];

/// Fold a city name for comparison. Returns an empty string for blank input.
pub fn normalize_city(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for ch in name.to_lowercase().chars() {
        match transliterate(ch) {
            Some(latin) => folded.push_str(latin),
            None if ch.is_ascii_alphanumeric() => folded.push(ch),
            // Punctuation, whitespace and anything unmapped separate tokens
            None => folded.push(' '),
        }
    }

    let mut tokens: Vec<&str> = folded.split_whitespace().collect();
    strip_locality_prefix(&mut tokens);
    tokens.join(" ")
}

/// Do two city names refer to the same place?
pub fn same_city(a: &str, b: &str) -> bool {
    let a = normalize_city(a);
    !a.is_empty() && a == normalize_city(b)
}

fn strip_locality_prefix(tokens: &mut Vec<&str>) {
    for prefix in LOCALITY_PREFIXES {
        if tokens.len() > prefix.len() && tokens[..prefix.len()] == **prefix {
            tokens.drain(..prefix.len());
            return;
        }
    }
}

/// Bulgarian/Russian Cyrillic and accented Latin to plain ASCII
fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'ё' | 'э' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' | 'ы' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sht",
        'ъ' => "a",
        'ь' => "y",
        'ю' => "yu",
        'я' => "ya",
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' => "a",
        'ç' | 'č' | 'ć' => "c",
        'ď' => "d",
        'é' | 'è' | 'ê' | 'ë' | 'ě' | 'ē' => "e",
        'ğ' => "g",
        'í' | 'ì' | 'î' | 'ï' | 'ı' => "i",
        'ł' => "l",
        'ñ' | 'ň' => "n",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => "o",
        'ř' => "r",
        'š' | 'ś' | 'ş' | 'ș' => "s",
        'ť' | 'ţ' | 'ț' => "t",
        'ú' | 'ù' | 'û' | 'ü' | 'ů' => "u",
        'ý' | 'ÿ' => "y",
        'ž' | 'ź' | 'ż' => "z",
        _ => return None,
    };
    Some(latin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyrillic_matches_latin() {
        assert_eq!(normalize_city("Варна"), "varna");
        assert!(same_city("Варна", "Varna"));
        assert!(same_city("Велико Търново", "Veliko-Tarnovo"));
    }

    #[test]
    fn test_locality_prefixes_are_stripped() {
        assert_eq!(normalize_city("гр. Варна"), "varna");
        assert_eq!(normalize_city("с. Kamenar"), "kamenar");
        assert_eq!(normalize_city("City of Sofia"), "sofia");
    }

    #[test]
    fn test_prefix_alone_is_kept() {
        // "Grad" on its own is a name, not a prefix
        assert_eq!(normalize_city("Grad"), "grad");
    }

    #[test]
    fn test_diacritics_and_punctuation() {
        assert_eq!(normalize_city("  Plzeň!! "), "plzen");
        assert_eq!(normalize_city("SÃO  Paulo"), "sao paulo");
    }

    #[test]
    fn test_blank_names_never_match() {
        assert_eq!(normalize_city("  ..  "), "");
        assert!(!same_city("", ""));
        assert!(!same_city("Varna", "Burgas"));
    }
}
