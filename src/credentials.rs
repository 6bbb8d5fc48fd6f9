use crate::domain::Dataset;

/// True when some row holds exactly this email and password, ignoring
/// surrounding whitespace.
pub fn exists(accounts: Option<&Dataset>, email: &str, password: &str) -> bool {
    let Some(accounts) = accounts else {
        return false;
    };
    let email = email.trim();
    let password = password.trim();
    if email.is_empty() || password.is_empty() {
        return false;
    }
    accounts.rows.iter().any(|row| match (row.first(), row.get(1)) {
        (Some(row_email), Some(row_password)) => {
            row_email.trim() == email && row_password.trim() == password
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_trimmed_pair() {
        let accounts = Dataset::new(
            "Sheet1".parse().unwrap(),
            vec![
                vec!["ops@example.com ".to_string(), "hunter2".to_string()],
                vec!["lonely@example.com".to_string()],
            ],
        );
        assert!(exists(Some(&accounts), " ops@example.com", "hunter2 "));
        assert!(!exists(Some(&accounts), "ops@example.com", "wrong"));
        assert!(!exists(Some(&accounts), "lonely@example.com", ""));
        assert!(!exists(None, "ops@example.com", "hunter2"));
    }
}
