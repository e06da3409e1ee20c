use validator::ValidationError;

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(ValidationError::new("password_too_short"));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::new("password_needs_uppercase"));
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::new("password_needs_lowercase"));
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err(ValidationError::new("password_needs_number"));
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(ValidationError::new("password_needs_special_char"));
    }

    Ok(())
}

pub fn validate_skills(skills: &[String]) -> Result<(), ValidationError> {
    if skills.iter().any(|s| s.trim().is_empty()) {
        return Err(ValidationError::new("blank_skill"));
    }
    if skills.iter().any(|s| s.trim().len() > 50) {
        return Err(ValidationError::new("skill_too_long"));
    }
    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        assert!(validate_password("Sh0rt!").is_err());
        assert!(validate_password("alllowercase1!").is_err());
        assert!(validate_password("NoDigitsHere!").is_err());
        assert!(validate_password("NoSpecial123").is_err());
        assert!(validate_password("Relief#2024").is_ok());
    }

    #[test]
    fn skills_must_not_be_blank() {
        assert!(validate_skills(&["first aid".into(), " ".into()]).is_err());
        assert!(validate_skills(&["driving".into()]).is_ok());
    }
}
