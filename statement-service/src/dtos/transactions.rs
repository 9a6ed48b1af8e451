use crate::models::Category;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryOverrideRequest {
    #[validate(custom(function = "validate_category"))]
    pub category: String,
}

fn validate_category(name: &str) -> Result<(), ValidationError> {
    match Category::from_name(name) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("unknown_category")),
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryOverrideResponse {
    pub id: String,
    pub category: Category,
    pub user_overridden: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_assignable_categories_validate() {
        let ok = CategoryOverrideRequest {
            category: "groceries".to_string(),
        };
        assert!(ok.validate().is_ok());

        for bad in ["UNKNOWN", "Pets", ""] {
            let request = CategoryOverrideRequest {
                category: bad.to_string(),
            };
            assert!(request.validate().is_err(), "{bad} should be rejected");
        }
    }
}
