// Fetch -> parse -> normalize -> analyze for a single symbol
use crate::analyzer::Analyzer;
use crate::fetcher::PriceFetcher;
use crate::model::{DrawdownReport, HistoryRequest, PipelineError};
use crate::normalizer::normalize_samples;
use crate::parser::Parser;
use tracing::info;

pub async fn analyze_symbol(
    fetcher: &dyn PriceFetcher,
    parser: &dyn Parser,
    analyzer: &dyn Analyzer,
    request: &HistoryRequest,
    threshold: f64,
) -> Result<DrawdownReport, PipelineError> {
    info!("[{}] Fetching price history...", request.symbol);
    let body = fetcher.fetch(request).await?;

    info!("[{}] Parsing chart payload ({} bytes)...", request.symbol, body.len());
    let samples = parser.parse(&body, &request.metric)?;

    let series = normalize_samples(samples)?;
    info!(
        "[{}] {} points from {} to {}",
        request.symbol,
        series.len(),
        series.first().timestamp.date_naive(),
        series.last().timestamp.date_naive()
    );

    let report = analyzer.analyze(&series, threshold)?;
    info!(
        "[{}] {} drawdown period(s), current drawdown {:.2}%",
        request.symbol,
        report.summary.period_count,
        report.summary.current_drawdown * 100.0
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerImpl;
    use crate::model::FetchError;
    use crate::parser::ChartParser;

    struct StubFetcher(Result<String, u16>);

    #[async_trait::async_trait]
    impl PriceFetcher for StubFetcher {
        async fn fetch(&self, _req: &HistoryRequest) -> Result<String, FetchError> {
            self.0.clone().map_err(FetchError::InvalidResponse)
        }
    }

    fn request() -> HistoryRequest {
        HistoryRequest {
            symbol: "ACME".into(),
            days: 10000,
            metric: "Price".into(),
        }
    }

    #[tokio::test]
    async fn runs_all_stages() {
        let body = r#"{"datasets":[{"metric":"Price","values":[
            ["2024-01-01","100"],["2024-01-02","90"],["2024-01-03","70"],
            ["2024-01-04","95"],["2024-01-05","60"],["2024-01-06","85"]]}]}"#;
        let fetcher = StubFetcher(Ok(body.to_string()));

        let report = analyze_symbol(&fetcher, &ChartParser::new(), &AnalyzerImpl::new(), &request(), 0.25)
            .await
            .unwrap();
        assert_eq!(report.periods.len(), 2);
        assert!(!report.summary.ongoing);
    }

    #[tokio::test]
    async fn surfaces_stage_errors() {
        let err = analyze_symbol(
            &StubFetcher(Err(503)),
            &ChartParser::new(),
            &AnalyzerImpl::new(),
            &request(),
            0.25,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(FetchError::InvalidResponse(503))));

        let empty = r#"{"datasets":[{"metric":"Price","values":[["2024-01-01",null]]}]}"#;
        let err = analyze_symbol(
            &StubFetcher(Ok(empty.to_string())),
            &ChartParser::new(),
            &AnalyzerImpl::new(),
            &request(),
            0.25,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Analysis(_)));
    }
}
