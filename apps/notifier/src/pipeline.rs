use std::future::Future;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use stock::{Article, NewsClient, PriceClient, StockError, TimeSeries, percent_change};
use tracing::{debug, info, instrument};
use tracing_futures::Instrument;

use crate::{
    alert::compose_body,
    config::AlertSettings,
    messenger::{SendError, TwilioClient},
};

pub trait PriceSource {
    fn daily_series(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<TimeSeries, StockError>> + Send;
}

pub trait NewsSource {
    fn top_articles(
        &self,
        query: &str,
        top_n: usize,
    ) -> impl Future<Output = Result<Vec<Article>, StockError>> + Send;
}

pub trait Messenger {
    /// Returns the provider's message id.
    fn send(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> impl Future<Output = Result<String, SendError>> + Send;
}

impl PriceSource for PriceClient {
    async fn daily_series(&self, symbol: &str) -> Result<TimeSeries, StockError> {
        self.fetch_daily(symbol).await
    }
}

impl NewsSource for NewsClient {
    async fn top_articles(&self, query: &str, top_n: usize) -> Result<Vec<Article>, StockError> {
        self.fetch_top(query, top_n).await
    }
}

impl Messenger for TwilioClient {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String, SendError> {
        self.send_message(from, to, body).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    BelowThreshold { change: i64 },
    Alerted { change: i64, message_ids: Vec<String> },
}

/// Fetch prices, compute the move and, when it clears the threshold, send
/// one message per top article. Stops at the first failure.
#[instrument(
    name = "run_alert",
    skip_all,
    fields(symbol = %settings.symbol, %today)
)]
pub async fn run_alert<P, N, M>(
    settings: &AlertSettings,
    today: NaiveDate,
    prices: &P,
    news: &N,
    messenger: &M,
) -> Result<Outcome>
where
    P: PriceSource,
    N: NewsSource,
    M: Messenger,
{
    let series = prices
        .daily_series(&settings.symbol)
        .await
        .with_context(|| format!("fetching daily prices for {}", settings.symbol))?;
    debug!(dates = series.len(), "fetched daily series");

    let change = percent_change(&series, today).context("computing percent change")?;
    info!(change, "stock change: {change}%");

    if change.unsigned_abs() < u64::from(settings.percent_threshold) {
        info!(
            threshold = settings.percent_threshold,
            "no significant stock change, no alerts sent"
        );
        return Ok(Outcome::BelowThreshold { change });
    }

    info!(
        threshold = settings.percent_threshold,
        "significant stock change detected, fetching news"
    );

    let mut articles = news
        .top_articles(&settings.company_name, settings.top_n)
        .await
        .with_context(|| format!("fetching news for {}", settings.company_name))?;
    articles.truncate(settings.top_n);

    let total = articles.len();
    info!(articles = total, "fetched articles");

    let mut message_ids = Vec::with_capacity(total);

    for (idx, article) in articles.iter().enumerate() {
        let body = compose_body(&settings.symbol, change, article);
        let span = tracing::info_span!("send_alert", index = idx + 1, total);

        let sid = async {
            let sid = messenger
                .send(&settings.sender, &settings.recipient, &body)
                .await?;
            info!(%sid, "sent message");
            Ok::<String, SendError>(sid)
        }
        .instrument(span)
        .await
        .with_context(|| format!("sending alert {} of {}", idx + 1, total))?;

        message_ids.push(sid);
    }

    Ok(Outcome::Alerted {
        change,
        message_ids,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use reqwest::StatusCode;
    use stock::parse_daily;

    use super::*;

    struct StubPrices {
        body: String,
        calls: AtomicUsize,
    }

    impl StubPrices {
        fn with_closes(recent: &str, prior: &str) -> Self {
            let body = format!(
                r#"{{"Time Series (Daily)": {{
                    "2024-05-02": {{"4. close": "{prior}"}},
                    "2024-05-03": {{"4. close": "{recent}"}}
                }}}}"#
            );
            Self::raw(&body)
        }

        fn raw(body: &str) -> Self {
            Self {
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PriceSource for StubPrices {
        async fn daily_series(&self, _symbol: &str) -> Result<TimeSeries, StockError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            parse_daily(&self.body)
        }
    }

    #[derive(Default)]
    struct StubNews {
        articles: Vec<Article>,
        requests: Mutex<Vec<(String, usize)>>,
    }

    impl StubNews {
        fn returning(count: usize) -> Self {
            let articles = (1..=count)
                .map(|n| Article {
                    title: Some(format!("headline {n}")),
                    description: Some(format!("brief {n}")),
                    ..Default::default()
                })
                .collect();
            Self {
                articles,
                ..Default::default()
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl NewsSource for StubNews {
        async fn top_articles(
            &self,
            query: &str,
            top_n: usize,
        ) -> Result<Vec<Article>, StockError> {
            self.requests
                .lock()
                .unwrap()
                .push((query.to_string(), top_n));
            // ignores top_n on purpose: the pipeline must cap on its own
            Ok(self.articles.clone())
        }
    }

    #[derive(Default)]
    struct StubMessenger {
        sent: Mutex<Vec<(String, String, String)>>,
        fail_on: Option<usize>,
    }

    impl StubMessenger {
        fn failing_on(n: usize) -> Self {
            Self {
                fail_on: Some(n),
                ..Default::default()
            }
        }

        fn bodies(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, _, body)| body.clone())
                .collect()
        }
    }

    impl Messenger for StubMessenger {
        async fn send(&self, from: &str, to: &str, body: &str) -> Result<String, SendError> {
            let mut sent = self.sent.lock().unwrap();
            let n = sent.len() + 1;
            if self.fail_on == Some(n) {
                return Err(SendError::Rejected {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    code: Some(20429),
                    message: "Too Many Requests".to_string(),
                });
            }
            sent.push((from.to_string(), to.to_string(), body.to_string()));
            Ok(format!("SM{n}"))
        }
    }

    fn settings() -> AlertSettings {
        AlertSettings {
            symbol: "TSLA".to_string(),
            company_name: "Tesla Inc".to_string(),
            percent_threshold: 1,
            top_n: 3,
            sender: "whatsapp:+14155238886".to_string(),
            recipient: "whatsapp:+1234567890".to_string(),
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    #[tokio::test]
    async fn flat_move_sends_nothing() {
        let prices = StubPrices::with_closes("100.0", "100.0");
        let news = StubNews::returning(3);
        let messenger = StubMessenger::default();

        let outcome = run_alert(&settings(), monday(), &prices, &news, &messenger)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::BelowThreshold { change: 0 });
        assert_eq!(news.request_count(), 0);
        assert!(messenger.bodies().is_empty());
    }

    #[tokio::test]
    async fn sends_one_message_per_article_capped_at_top_n() {
        let prices = StubPrices::with_closes("100.0", "95.0");
        let news = StubNews::returning(5);
        let messenger = StubMessenger::default();

        let outcome = run_alert(&settings(), monday(), &prices, &news, &messenger)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Alerted {
                change: 5,
                message_ids: vec!["SM1".to_string(), "SM2".to_string(), "SM3".to_string()],
            }
        );
        assert_eq!(
            *news.requests.lock().unwrap(),
            vec![("Tesla Inc".to_string(), 3)]
        );

        let bodies = messenger.bodies();
        assert_eq!(bodies.len(), 3);
        assert_eq!(bodies[0], "TSLA 🔺5%\nHeadline: headline 1\nBrief: brief 1");
        assert_eq!(bodies[2], "TSLA 🔺5%\nHeadline: headline 3\nBrief: brief 3");

        let sent = messenger.sent.lock().unwrap();
        assert!(sent.iter().all(|(from, to, _)| {
            from == "whatsapp:+14155238886" && to == "whatsapp:+1234567890"
        }));
    }

    #[tokio::test]
    async fn drop_uses_down_arrow() {
        let prices = StubPrices::with_closes("80.0", "100.0");
        let news = StubNews::returning(1);
        let messenger = StubMessenger::default();

        let outcome = run_alert(&settings(), monday(), &prices, &news, &messenger)
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Alerted { change: -25, .. }));
        assert!(messenger.bodies()[0].starts_with("TSLA 🔻25%\n"));
    }

    #[tokio::test]
    async fn no_articles_is_not_an_error() {
        let prices = StubPrices::with_closes("100.0", "95.0");
        let news = StubNews::default();
        let messenger = StubMessenger::default();

        let outcome = run_alert(&settings(), monday(), &prices, &news, &messenger)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Alerted {
                change: 5,
                message_ids: vec![],
            }
        );
        assert_eq!(news.request_count(), 1);
        assert!(messenger.bodies().is_empty());
    }

    #[tokio::test]
    async fn missing_series_fails_before_news() {
        let prices = StubPrices::raw(r#"{"Meta Data": {"2. Symbol": "TSLA"}}"#);
        let news = StubNews::returning(3);
        let messenger = StubMessenger::default();

        let err = run_alert(&settings(), monday(), &prices, &news, &messenger)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("fetching daily prices for TSLA"));
        assert!(matches!(
            err.downcast_ref::<StockError>(),
            Some(StockError::DataFormat(_))
        ));
        assert_eq!(prices.calls.load(Ordering::SeqCst), 1);
        assert_eq!(news.request_count(), 0);
        assert!(messenger.bodies().is_empty());
    }

    #[tokio::test]
    async fn short_history_fails_before_news() {
        let prices = StubPrices::with_closes("100.0", "90.0");
        let news = StubNews::returning(3);
        let messenger = StubMessenger::default();
        let today = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();

        let err = run_alert(&settings(), today, &prices, &news, &messenger)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StockError>(),
            Some(StockError::InsufficientHistory { needed: 3, found: 2 })
        ));
        assert_eq!(news.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_send_aborts_remaining() {
        let prices = StubPrices::with_closes("100.0", "95.0");
        let news = StubNews::returning(3);
        let messenger = StubMessenger::failing_on(2);

        let err = run_alert(&settings(), monday(), &prices, &news, &messenger)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("sending alert 2 of 3"));
        assert!(matches!(
            err.downcast_ref::<SendError>(),
            Some(SendError::Rejected { .. })
        ));
        assert_eq!(messenger.bodies().len(), 1);
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let mut settings = settings();
        settings.percent_threshold = 5;

        let prices = StubPrices::with_closes("100.0", "95.0");
        let news = StubNews::returning(1);
        let messenger = StubMessenger::default();

        let outcome = run_alert(&settings, monday(), &prices, &news, &messenger)
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Alerted { change: 5, .. }));

        settings.percent_threshold = 6;
        let outcome = run_alert(&settings, monday(), &prices, &news, &messenger)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::BelowThreshold { change: 5 });
    }
}
