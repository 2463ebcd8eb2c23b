use thiserror::Error;
use uuid::Uuid;

use crate::models::AgentProfile;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("You can't rate your own profile")]
    SelfRating,

    #[error("Please select a rating between 1 and 5")]
    OutOfRange(i16),
}

/// Reject a rating outside 1..=5 (0 means "nothing selected")
pub fn validate_rating_value(value: i16) -> Result<(), RatingError> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(())
    } else {
        Err(RatingError::OutOfRange(value))
    }
}

/// Reject a rater whose account is the one behind the agent profile
pub fn ensure_not_self(rater_id: Uuid, profile: &AgentProfile) -> Result<(), RatingError> {
    if profile.user_id == rater_id {
        Err(RatingError::SelfRating)
    } else {
        Ok(())
    }
}

/// Review aggregates recomputed from every rating row of an agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub num_reviews: i32,
    /// Mean rating rounded to two decimals; `None` without reviews
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = i16>,
    {
        let (count, total) = values
            .into_iter()
            .fold((0i32, 0i64), |(count, total), v| (count + 1, total + v as i64));

        let average = if count > 0 {
            let mean = total as f64 / count as f64;
            Some((mean * 100.0).round() / 100.0)
        } else {
            None
        };

        Self {
            num_reviews: count,
            average,
        }
    }

    pub fn apply_to(&self, profile: &mut AgentProfile) {
        profile.num_reviews = self.num_reviews;
        profile.rating = self.average;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_agent() -> AgentProfile {
        AgentProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            is_agent: true,
            num_reviews: 0,
            rating: None,
        }
    }

    #[test]
    fn test_rating_range() {
        assert_eq!(validate_rating_value(0), Err(RatingError::OutOfRange(0)));
        assert_eq!(validate_rating_value(6), Err(RatingError::OutOfRange(6)));
        assert!(validate_rating_value(1).is_ok());
        assert!(validate_rating_value(5).is_ok());
    }

    #[test]
    fn test_self_rating_detected() {
        let agent = create_test_agent();
        assert_eq!(ensure_not_self(agent.user_id, &agent), Err(RatingError::SelfRating));
        assert!(ensure_not_self(Uuid::new_v4(), &agent).is_ok());
    }

    #[test]
    fn test_summary_average() {
        let summary = RatingSummary::from_values([3, 5]);
        assert_eq!(summary.num_reviews, 2);
        assert_eq!(summary.average, Some(4.0));

        let summary = RatingSummary::from_values([5, 4, 4]);
        assert_eq!(summary.average, Some(4.33));
    }

    #[test]
    fn test_summary_empty() {
        let summary = RatingSummary::from_values(std::iter::empty());
        assert_eq!(summary.num_reviews, 0);
        assert_eq!(summary.average, None);
    }

    #[test]
    fn test_apply_to_profile() {
        let mut agent = create_test_agent();
        RatingSummary::from_values([2, 4]).apply_to(&mut agent);
        assert_eq!(agent.num_reviews, 2);
        assert_eq!(agent.rating, Some(3.0));
    }
}
