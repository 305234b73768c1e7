use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown lead status `{0}`")]
    UnknownLeadStatus(String),
}

#[cfg(test)]
mod tests {
    use super::DomainError;

    #[test]
    fn unknown_status_names_the_offending_label() {
        let error = DomainError::UnknownLeadStatus("Archived".to_string());
        assert_eq!(error.to_string(), "unknown lead status `Archived`");
    }
}
