use crate::utils::error::{EtlError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// Neo4j 以 Bolt 協定連線：bolt / neo4j，以及 `+s`、`+ssc` 的 TLS 變體
pub fn validate_bolt_uri(field_name: &str, uri: &str) -> Result<()> {
    const SCHEMES: [&str; 6] = ["bolt", "bolt+s", "bolt+ssc", "neo4j", "neo4j+s", "neo4j+ssc"];

    let url = Url::parse(uri).map_err(|e| EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: uri.to_string(),
        reason: format!("Invalid URI format: {}", e),
    })?;

    if !SCHEMES.contains(&url.scheme()) || url.host_str().is_none() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: uri.to_string(),
            reason: "Expected a bolt:// or neo4j:// URI with a host".to_string(),
        });
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 必填欄位：空白字串視為缺少
pub fn validate_present(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::missing(field_name));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Labels and relationship types are spliced into Cypher text, so they must be plain identifiers.
pub fn validate_cypher_identifier(field_name: &str, value: &str) -> Result<()> {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let re = IDENT.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    });

    if !re.is_match(value) {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Not a valid Cypher identifier".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api_base_url", "https://example.com").is_ok());
        assert!(validate_url("api_base_url", "http://localhost:9050").is_ok());
        assert!(validate_url("api_base_url", "").is_err());
        assert!(validate_url("api_base_url", "invalid-url").is_err());
        assert!(validate_url("api_base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_bolt_uri() {
        assert!(validate_bolt_uri("neo4j_endpoint", "bolt://localhost:7687").is_ok());
        assert!(validate_bolt_uri("neo4j_endpoint", "neo4j+s://graph.internal:7687").is_ok());
        assert!(validate_bolt_uri("neo4j_endpoint", "http://localhost:7474").is_err());
        assert!(validate_bolt_uri("neo4j_endpoint", "localhost:7687").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("transaction_size", 500, 1).is_ok());
        assert!(validate_positive_number("transaction_size", 0, 1).is_err());
    }

    #[test]
    fn test_validate_present() {
        assert!(matches!(
            validate_present("endpoint", ""),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validate_cypher_identifier() {
        assert!(validate_cypher_identifier("label", "Table").is_ok());
        assert!(validate_cypher_identifier("type", "COLUMN_OF").is_ok());
        assert!(validate_cypher_identifier("label", "Table) DETACH DELETE n //").is_err());
        assert!(validate_cypher_identifier("label", "1Table").is_err());
    }
}
