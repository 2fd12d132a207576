mod change;
mod error;
mod news_client;
mod price_client;

pub use change::percent_change;
pub use error::StockError;
pub use news_client::{Article, ArticleSource, NewsClient, parse_articles};
pub use price_client::{DailyBar, PriceClient, TimeSeries, parse_daily};
