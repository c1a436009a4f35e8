//! Canonical column naming.
//!
//! Raw IVAC exports mix accents, capitals, spaces and punctuation in their
//! headers ("Taux de Réussite G", "VA du taux de réussite G"). Every other
//! module addresses columns by the snake_case form produced here.

/// French diacritics folded to their base Latin letter.
const DIACRITICS: [(char, char); 15] = [
    ('é', 'e'),
    ('è', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('à', 'a'),
    ('â', 'a'),
    ('ä', 'a'),
    ('ç', 'c'),
    ('ù', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
    ('ô', 'o'),
    ('ö', 'o'),
    ('î', 'i'),
    ('ï', 'i'),
];

fn fold_diacritic(c: char) -> char {
    DIACRITICS
        .iter()
        .find(|(accented, _)| *accented == c)
        .map(|(_, base)| *base)
        .unwrap_or(c)
}

/// Normalize a raw column name to snake_case.
///
/// Trims, lowercases, folds French diacritics, then replaces every run of
/// characters outside `[a-z0-9]` with a single underscore and strips
/// underscores at both ends. The output only contains `[a-z0-9_]`, so the
/// function is idempotent.
///
/// # Example
///
/// ```rust,ignore
/// use ivac_prep::normalize::normalize_column_name;
///
/// assert_eq!(normalize_column_name("Taux de Réussite G"), "taux_de_reussite_g");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.trim().chars().flat_map(char::to_lowercase) {
        let c = fold_diacritic(c);
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }

    out
}
