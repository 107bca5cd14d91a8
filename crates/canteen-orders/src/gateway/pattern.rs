//! Topic and pattern grammar: `/`-separated levels, `+` matches exactly one level,
//! `#` matches the remaining levels (including none) and must be the last level.

use crate::gateway::GatewayError;

/// A concrete topic to publish on: non-empty, no wildcards.
pub fn validate_topic(topic: &str) -> Result<(), GatewayError> {
    if topic.is_empty() {
        return Err(GatewayError::InvalidTopic("empty topic".into()));
    }
    if topic.contains(['+', '#', '\0']) {
        return Err(GatewayError::InvalidTopic(format!(
            "{topic}: wildcards are not allowed in a topic"
        )));
    }
    Ok(())
}

pub fn validate_pattern(pattern: &str) -> Result<(), GatewayError> {
    if pattern.is_empty() {
        return Err(GatewayError::InvalidPattern("empty pattern".into()));
    }
    let levels: Vec<&str> = pattern.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        if level.contains('#') && (*level != "#" || i + 1 != levels.len()) {
            return Err(GatewayError::InvalidPattern(format!(
                "{pattern}: '#' must be a whole level and the last one"
            )));
        }
        if level.contains('+') && *level != "+" {
            return Err(GatewayError::InvalidPattern(format!(
                "{pattern}: '+' must be a whole level"
            )));
        }
    }
    Ok(())
}

/// Whether `topic` is matched by the (valid) `pattern`.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_level_wildcard() {
        assert!(topic_matches("notify/order/+", "notify/order/u1"));
        assert!(!topic_matches("notify/order/+", "notify/order"));
        assert!(!topic_matches("notify/order/+", "notify/order/u1/extra"));
        assert!(topic_matches("+/kitchen/+", "orders/kitchen/cancel"));
    }

    #[test]
    fn multi_level_wildcard() {
        assert!(topic_matches("orders/#", "orders/intake"));
        assert!(topic_matches("orders/#", "orders/kitchen/intake"));
        assert!(topic_matches("orders/#", "orders"));
        assert!(topic_matches("#", "notify/order/u1"));
        assert!(!topic_matches("orders/#", "notify/order/u1"));
    }

    #[test]
    fn literal_patterns_match_exactly() {
        assert!(topic_matches("orders/intake", "orders/intake"));
        assert!(!topic_matches("orders/intake", "orders/intake/x"));
        assert!(!topic_matches("orders/intake", "orders"));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        for bad in ["", "orders/#/x", "orders/ki#", "orders/k+", "#/x"] {
            assert!(validate_pattern(bad).is_err(), "{bad}");
        }
        for good in ["#", "+", "orders/+/intake", "notify/order/#"] {
            assert!(validate_pattern(good).is_ok(), "{good}");
        }
        assert!(validate_topic("notify/order/+").is_err());
        assert!(validate_topic("notify/order/u1").is_ok());
    }
}
