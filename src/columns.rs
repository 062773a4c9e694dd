// src/columns.rs
pub const DATE: &[&str] = &["fecha", "date"];
pub const NAME: &[&str] = &["nombre", "name"];
pub const EMAIL: &[&str] = &["email", "correo"];
pub const STATUS: &[&str] = &["estado", "status"];
pub const PHONE: &[&str] = &["telefono", "teléfono", "phone", "celular"];

// keywords are lowercase, first matching header wins
pub fn header_matches(header: &str, keywords: &[&str]) -> bool {
    let header_lower = header.to_lowercase();
    keywords.iter().any(|keyword| header_lower.contains(keyword))
}

pub fn find_column<'a>(headers: &'a [String], keywords: &[&str]) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header_matches(header, keywords))
        .map(String::as_str)
}
