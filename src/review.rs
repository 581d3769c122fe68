//! Review score categories.
//!
//! The blog's review posts attach a per-category score block. Each
//! category has a fixed set of 0–10 axes; the average is always computed
//! over exactly the active category's axes, so adding a category means
//! adding a variant here, not another string branch.

use serde::{Deserialize, Serialize};

/// Score block for one review post, tagged by category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum ReviewScores {
    Anime {
        story: f64,
        animation: f64,
        sound: f64,
        characters: f64,
        enjoyment: f64,
    },
    Manga {
        story: f64,
        art: f64,
        characters: f64,
        enjoyment: f64,
    },
    Movies {
        plot: f64,
        acting: f64,
        cinematography: f64,
        soundtrack: f64,
        enjoyment: f64,
    },
    TvSeries {
        plot: f64,
        acting: f64,
        production: f64,
        enjoyment: f64,
    },
    BooksFiction {
        plot: f64,
        prose: f64,
        characters: f64,
        enjoyment: f64,
    },
    BooksNonFiction {
        insight: f64,
        clarity: f64,
        rigor: f64,
        enjoyment: f64,
    },
}

impl ReviewScores {
    /// Mean over the active category's axes.
    pub fn average(&self) -> f64 {
        let (sum, count) = match *self {
            ReviewScores::Anime {
                story,
                animation,
                sound,
                characters,
                enjoyment,
            } => (story + animation + sound + characters + enjoyment, 5.0),
            ReviewScores::Manga {
                story,
                art,
                characters,
                enjoyment,
            } => (story + art + characters + enjoyment, 4.0),
            ReviewScores::Movies {
                plot,
                acting,
                cinematography,
                soundtrack,
                enjoyment,
            } => (plot + acting + cinematography + soundtrack + enjoyment, 5.0),
            ReviewScores::TvSeries {
                plot,
                acting,
                production,
                enjoyment,
            } => (plot + acting + production + enjoyment, 4.0),
            ReviewScores::BooksFiction {
                plot,
                prose,
                characters,
                enjoyment,
            } => (plot + prose + characters + enjoyment, 4.0),
            ReviewScores::BooksNonFiction {
                insight,
                clarity,
                rigor,
                enjoyment,
            } => (insight + clarity + rigor + enjoyment, 4.0),
        };
        sum / count
    }

    /// The category's slug, matching the serialized tag.
    pub fn category(&self) -> &'static str {
        match self {
            ReviewScores::Anime { .. } => "anime",
            ReviewScores::Manga { .. } => "manga",
            ReviewScores::Movies { .. } => "movies",
            ReviewScores::TvSeries { .. } => "tv-series",
            ReviewScores::BooksFiction { .. } => "books-fiction",
            ReviewScores::BooksNonFiction { .. } => "books-non-fiction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_over_active_variant_only() {
        let scores = ReviewScores::Anime {
            story: 8.0,
            animation: 9.0,
            sound: 7.0,
            characters: 8.0,
            enjoyment: 10.0,
        };
        assert!((scores.average() - 8.4).abs() < 1e-9);

        let scores = ReviewScores::BooksNonFiction {
            insight: 9.0,
            clarity: 7.0,
            rigor: 8.0,
            enjoyment: 8.0,
        };
        assert!((scores.average() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_tagged_serde_round_trip() {
        let scores = ReviewScores::TvSeries {
            plot: 7.0,
            acting: 8.0,
            production: 6.0,
            enjoyment: 9.0,
        };

        let json = serde_json::to_string(&scores).unwrap();
        assert!(json.contains(r#""category":"tv-series""#));

        let back: ReviewScores = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scores);
        assert_eq!(back.category(), "tv-series");
    }
}
