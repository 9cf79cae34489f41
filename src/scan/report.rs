//! Report rendering for one scan.
//! All functions are pure: they take a finished scan and return text.

use super::orchestrator::Ladder;
use super::{EdgeResult, ScanOutcome, SkippedObservation};
use crate::edge::comparator::{Classification, ReferenceSource};
use crate::errors::EngineResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub underlying: String,
    pub spot: Option<f64>,
    pub chain_size: usize,
    pub summary: ScanSummary,
    pub results: Vec<EdgeResult>,
    pub skipped: Vec<SkippedObservation>,
}

/// Aggregate counts over one scan. Used by every renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScanSummary {
    pub processed: usize,
    pub skipped: usize,
    pub overpriced: usize,
    pub underpriced: usize,
    /// Results whose reference came from a tradeable spread
    pub replicated: usize,
    pub max_abs_edge: f64,
}

pub fn summarize(outcome: &ScanOutcome) -> ScanSummary {
    let mut s = ScanSummary {
        processed: outcome.results.len(),
        skipped: outcome.skipped.len(),
        ..Default::default()
    };
    for r in &outcome.results {
        match r.classification {
            Classification::Overpriced => s.overpriced += 1,
            Classification::Underpriced => s.underpriced += 1,
            Classification::NoSignal => {}
        }
        if r.reference_source == ReferenceSource::Replication {
            s.replicated += 1;
        }
        s.max_abs_edge = s.max_abs_edge.max(r.edge.abs());
    }
    s
}

impl ScanReport {
    pub fn new(
        underlying: &str,
        spot: Option<f64>,
        chain_size: usize,
        generated_at: DateTime<Utc>,
        outcome: ScanOutcome,
    ) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            generated_at,
            underlying: underlying.to_string(),
            spot,
            chain_size,
            summary: summarize(&outcome),
            results: outcome.results,
            skipped: outcome.skipped,
        }
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::with_capacity(256 + self.results.len() * 160);
        let _ = writeln!(
            out,
            "{} touch scan {} at {}",
            self.underlying,
            self.scan_id,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(
            out,
            "spot {}  chain {}  processed {}  skipped {}  over {}  under {}",
            fmt_money(self.spot),
            self.chain_size,
            self.summary.processed,
            self.summary.skipped,
            self.summary.overpriced,
            self.summary.underpriced,
        );
        out.push('\n');
        let _ = writeln!(
            out,
            "{:>10} {:>10} {:>4} {:>7} {:>7} {:>7} {:>7} {:>8} {:>5}  {:<11} question",
            "strike", "expiry", "dir", "obs", "touch", "repl", "ref", "edge", "t/e", "signal"
        );
        for r in &self.results {
            let e = &r.estimate;
            let _ = writeln!(
                out,
                "{:>10.0} {:>10} {:>4} {:>7} {:>7} {:>7} {:>7} {:>+8.3} {:>5}  {:<11} {}",
                r.observation.strike,
                r.observation.expiry,
                e.direction,
                pct(Some(r.observation.observed_probability)),
                pct(Some(e.analytic_probability)),
                pct(e.replicated_probability),
                pct(Some(r.reference_probability)),
                r.edge,
                e.touch_to_digital_ratio()
                    .map(|x| format!("{x:.2}"))
                    .unwrap_or_else(|| "-".into()),
                r.classification,
                r.observation.question,
            );
        }
        if !self.skipped.is_empty() {
            out.push('\n');
            let _ = writeln!(out, "skipped:");
            for s in &self.skipped {
                let _ = writeln!(out, "  {:<12} {} ({})", s.id, s.question, s.reason);
            }
        }
        out
    }

    /// Self-contained page, no external assets.
    pub fn render_html(&self) -> String {
        let mut rows = String::new();
        for r in &self.results {
            let e = &r.estimate;
            let class = match r.classification {
                Classification::Overpriced => "over",
                Classification::Underpriced => "under",
                Classification::NoSignal => "none",
            };
            let _ = write!(
                rows,
                "<tr class=\"{class}\"><td><a href=\"{url}\">{question}</a></td>\
                 <td>{strike:.0}</td><td>{expiry}</td><td>{aligned}</td><td>{dir}</td>\
                 <td>{obs}</td><td>{touch}</td><td>{repl}</td><td>{digital}</td>\
                 <td>{edge:+.3}</td><td>{signal}</td></tr>\n",
                url = escape_html(&r.observation.url),
                question = escape_html(&r.observation.question),
                strike = r.observation.strike,
                expiry = r.observation.expiry,
                aligned = e.aligned_expiry,
                dir = e.direction,
                obs = pct(Some(r.observation.observed_probability)),
                touch = pct(Some(e.analytic_probability)),
                repl = match (e.replicated_probability, e.replication_unavailable) {
                    (Some(p), _) => pct(Some(p)),
                    (None, Some(reason)) => escape_html(&reason.to_string()),
                    (None, None) => "-".into(),
                },
                digital = pct(e.market_digital.or(Some(e.analytic_digital))),
                edge = r.edge,
                signal = r.classification,
            );
        }

        let mut skipped = String::new();
        for s in &self.skipped {
            let _ = writeln!(
                skipped,
                "<li>{}: {}</li>",
                escape_html(&s.question),
                escape_html(&s.reason.to_string())
            );
        }

        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
             <title>{u} touch scan</title>\
             <style>body{{font-family:monospace;margin:2em}}table{{border-collapse:collapse}}\
             td,th{{padding:4px 8px;border-bottom:1px solid #ddd;text-align:right}}\
             td:first-child{{text-align:left}}.over{{background:#fde2e2}}.under{{background:#e2f5e2}}</style>\
             </head><body>\n<h1>{u} touch scan</h1>\n\
             <p>scan {id} at {at} &middot; spot {spot} &middot; chain {chain} &middot; \
             processed {processed} &middot; skipped {skipped_n} &middot; \
             overpriced {over} &middot; underpriced {under}</p>\n\
             <table><thead><tr><th>market</th><th>strike</th><th>expiry</th><th>aligned</th>\
             <th>dir</th><th>observed</th><th>touch</th><th>replicated</th><th>digital</th>\
             <th>edge</th><th>signal</th></tr></thead><tbody>\n{rows}</tbody></table>\n\
             <h2>skipped</h2><ul>\n{skipped}</ul>\n</body></html>\n",
            u = escape_html(&self.underlying),
            id = self.scan_id,
            at = self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            spot = fmt_money(self.spot),
            chain = self.chain_size,
            processed = self.summary.processed,
            skipped_n = self.summary.skipped,
            over = self.summary.overpriced,
            under = self.summary.underpriced,
        )
    }
}

pub fn render_ladder_text(ladder: &Ladder) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "target {} aligned {}",
        ladder.target_expiry, ladder.aligned_expiry
    );
    let _ = writeln!(
        out,
        "{:>10} {:>10} {:>10} {:>9} {:>8} {:>8}",
        "strike", "long", "credit", "width", "touch", "no-touch"
    );
    for rung in &ladder.rungs {
        match (&rung.replication, rung.unavailable) {
            (Some(rep), _) => {
                let _ = writeln!(
                    out,
                    "{:>10.0} {:>10.0} {:>10.2} {:>9.0} {:>8} {:>8}",
                    rung.strike,
                    rep.bracket.long_strike,
                    rep.credit,
                    rep.width,
                    pct(Some(rep.probability)),
                    pct(rung.no_touch_value()),
                );
            }
            (None, reason) => {
                let _ = writeln!(
                    out,
                    "{:>10.0}  unavailable: {}",
                    rung.strike,
                    reason.map(|r| r.to_string()).unwrap_or_default()
                );
            }
        }
    }
    out
}

fn pct(p: Option<f64>) -> String {
    match p {
        Some(p) if p.is_finite() => format!("{:.1}%", p * 100.0),
        _ => "-".into(),
    }
}

fn fmt_money(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "-".into())
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::test_support::*;
    use crate::chain::InstrumentChain;
    use crate::scan::orchestrator::{ladder, run_scan};
    use crate::scan::{ExternalObservation, ScanSettings};
    use chrono::NaiveTime;

    fn report() -> ScanReport {
        let chain = InstrumentChain::new(
            "BTC",
            vec![
                call("2026-03-27", 100_000.0, Some(0.02), Some(0.025)),
                call("2026-03-27", 105_000.0, Some(0.008), Some(0.01)),
            ],
        );
        let as_of = date("2026-01-01").and_time(NaiveTime::MIN).and_utc();
        let observations = vec![
            ExternalObservation {
                id: "1".into(),
                question: "Will Bitcoin reach $100,000 <soon>?".into(),
                strike: 100_000.0,
                expiry: date("2026-03-01"),
                observed_probability: 0.8,
                url: "https://polymarket.com/event/btc-100k".into(),
                direction: None,
            },
            ExternalObservation {
                id: "2".into(),
                question: "Will Bitcoin reach $100,000 in 2027?".into(),
                strike: 100_000.0,
                expiry: date("2027-06-01"),
                observed_probability: 0.3,
                url: "https://polymarket.com/event/btc-2027".into(),
                direction: None,
            },
        ];
        let outcome = run_scan(&chain, &observations, as_of, &ScanSettings::default());
        ScanReport::new("BTC", chain.quotes()[0].spot(), chain.len(), as_of, outcome)
    }

    #[test]
    fn test_summary_counts() {
        let r = report();
        assert_eq!(r.summary.processed, 1);
        assert_eq!(r.summary.skipped, 1);
        assert_eq!(r.summary.overpriced, 1);
        assert_eq!(r.summary.replicated, 1);
        assert!((r.summary.max_abs_edge - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_json_carries_scan_id_and_results() {
        let r = report();
        let v: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(v["scan_id"], r.scan_id.to_string());
        assert_eq!(v["results"][0]["classification"], "overpriced");
        assert_eq!(v["results"][0]["reference_source"], "replication");
        assert_eq!(v["skipped"][0]["reason"]["no_coverage"]["target"], "2027-06-01");
    }

    #[test]
    fn test_text_lists_results_and_skips() {
        let text = report().render_text();
        assert!(text.contains("processed 1"));
        assert!(text.contains("overpriced"));
        assert!(text.contains("+0.400"));
        assert!(text.contains("skipped:"));
        assert!(text.contains("no listed expiry on or after 2027-06-01"));
    }

    #[test]
    fn test_html_escapes_market_text() {
        let html = report().render_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("&lt;soon&gt;"));
        assert!(!html.contains("<soon>"));
        assert!(html.contains("class=\"over\""));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
    }

    #[test]
    fn test_ladder_text() {
        let chain = InstrumentChain::new(
            "BTC",
            vec![
                call("2026-03-27", 100_000.0, Some(0.02), Some(0.025)),
                call("2026-03-27", 105_000.0, Some(0.008), Some(0.01)),
            ],
        );
        let l = ladder(&chain, date("2026-03-01"), &[100_000.0, 105_000.0]).unwrap();
        let text = render_ladder_text(&l);
        assert!(text.contains("40.0%"));
        assert!(text.contains("60.0%"));
        assert!(text.contains("unavailable: no listed call strike above the short leg"));
    }
}
