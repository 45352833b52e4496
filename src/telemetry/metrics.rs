//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current balance
    Balance,
    /// Realized P&L
    RealizedPnl,
    /// Open position count
    OpenPositions,
    /// Completed trades
    TradesTotal,
    /// Winning trades
    WinsTotal,
    /// Losing trades
    LossesTotal,
}

impl GaugeMetric {
    fn name(&self) -> &'static str {
        match self {
            GaugeMetric::Balance => "polyrevert_balance_usd",
            GaugeMetric::RealizedPnl => "polyrevert_realized_pnl_usd",
            GaugeMetric::OpenPositions => "polyrevert_open_positions",
            GaugeMetric::TradesTotal => "polyrevert_trades_total",
            GaugeMetric::WinsTotal => "polyrevert_wins_total",
            GaugeMetric::LossesTotal => "polyrevert_losses_total",
        }
    }
}

/// Start the Prometheus exporter on the given port
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(port, "Prometheus metrics exporter listening");
    Ok(())
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Set the per-asset Z-score gauge
pub fn set_asset_zscore(asset: &str, value: f64) {
    metrics::gauge!("polyrevert_zscore", "asset" => asset.to_string()).set(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_metric_names() {
        assert_eq!(GaugeMetric::Balance.name(), "polyrevert_balance_usd");
        assert_eq!(GaugeMetric::OpenPositions.name(), "polyrevert_open_positions");
    }

    #[test]
    fn test_set_gauge_without_recorder() {
        // With no recorder installed these are no-ops, not panics
        set_gauge(GaugeMetric::Balance, 100.0);
        set_asset_zscore("BTC", 1.5);
    }
}
