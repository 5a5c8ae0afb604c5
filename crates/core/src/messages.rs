//! User-facing validation messages.
//!
//! Clients display these strings verbatim and existing consumers match on
//! them, so the German wording must not change.

pub fn required(title: &str) -> String {
    format!("'{}' ist ein Pflichtfeld", title)
}

pub fn invalid_email() -> String {
    "Ungültige E-Mail-Adresse".to_string()
}

pub fn invalid_url() -> String {
    "Ungültige URL".to_string()
}

pub fn rating_out_of_range(max: i64) -> String {
    format!("Bewertung muss zwischen 1 und {} liegen", max)
}

pub fn invalid_option(option: &str) -> String {
    format!("Ungültige Option: {}", option)
}

pub fn too_long(max_length: i64) -> String {
    format!("Maximal {} Zeichen erlaubt", max_length)
}

pub fn file_type_not_allowed(extension: &str) -> String {
    format!("Dateityp {} ist nicht erlaubt", extension)
}
