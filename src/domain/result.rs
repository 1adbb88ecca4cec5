//! Result type alias for the relay

use super::errors::RelayError;

/// Result type alias for relay operations
///
/// # Examples
///
/// ```
/// use fhir_relay::domain::result::Result;
/// use fhir_relay::domain::errors::RelayError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(RelayError::MalformedBundle("not a bundle".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
