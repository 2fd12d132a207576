use stock::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Zero counts as down.
    pub fn from_change(change: i64) -> Self {
        if change > 0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Direction::Up => "🔺",
            Direction::Down => "🔻",
        }
    }
}

/// Build the message for one article.
///
/// ```text
/// TSLA 🔺5%
/// Headline: <title>
/// Brief: <description>
/// ```
pub fn compose_body(symbol: &str, change: i64, article: &Article) -> String {
    format!(
        "{} {}{}%\nHeadline: {}\nBrief: {}",
        symbol,
        Direction::from_change(change).symbol(),
        change.unsigned_abs(),
        article.title(),
        article.description()
    )
}
