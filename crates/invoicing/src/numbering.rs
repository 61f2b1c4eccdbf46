/// Placeholder replaced by the current year in invoice number prefixes.
pub const YEAR_PLACEHOLDER: &str = "{YEAR}";

/// Suggest the next invoice number: the account prefix with `{YEAR}`
/// substituted, followed by `existing_count + 1` padded to three digits.
pub fn next_invoice_number(prefix: &str, year: i32, existing_count: usize) -> String {
    let prefix = prefix.replace(YEAR_PLACEHOLDER, &year.to_string());
    format!("{prefix}{:03}", existing_count + 1)
}
