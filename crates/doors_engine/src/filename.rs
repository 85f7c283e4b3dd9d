use std::path::Path;

use unicode_normalization::UnicodeNormalization;

/// Lower-case ASCII slug: accents folded away, every run of other characters
/// collapsed into one `_`, no leading or trailing `_`.
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_sep = false;
    for c in input.nfkd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// `city[_street][_rta]`, each part slugged; blank parts are skipped.
pub fn listing_prefix(city: &str, street: Option<&str>, rta: Option<&str>) -> String {
    [Some(city), street, rta]
        .into_iter()
        .flatten()
        .map(slug)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Prefix for detail exports: the slugged input file stem with `doors_` removed.
pub fn detail_prefix(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().replace("doors_", ""))
        .unwrap_or_default();
    match slug(&stem) {
        prefix if prefix.is_empty() => "input".to_string(),
        prefix => prefix,
    }
}

/// `{kind}_{prefix}_{timestamp}.{ext}`, or `{kind}_{timestamp}.{ext}` without a prefix.
pub fn export_filename(kind: &str, prefix: &str, timestamp: &str, ext: &str) -> String {
    if prefix.is_empty() {
        format!("{kind}_{timestamp}.{ext}")
    } else {
        format!("{kind}_{prefix}_{timestamp}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_folds_accents_and_separators() {
        assert_eq!(slug("Trois-Rivières"), "trois_rivieres");
        assert_eq!(slug("  Rue  de l'Église "), "rue_de_l_eglise");
        assert_eq!(slug("H2X"), "h2x");
        assert_eq!(slug("--"), "");
    }

    #[test]
    fn detail_prefix_strips_listing_marker() {
        assert_eq!(
            detail_prefix(Path::new("/tmp/doors_laval_20240101-000000.json")),
            "laval_20240101_000000"
        );
        assert_eq!(detail_prefix(Path::new("Comptes été.csv")), "comptes_ete");
        assert_eq!(detail_prefix(Path::new("doors_.json")), "input");
    }
}
