#[cfg(test)]
mod tests {
    use super::super::*;

    fn calm() -> StabilitySignals {
        StabilitySignals {
            ready_state: "complete".to_string(),
            pending_requests: 0,
            loading_images: 0,
            loading_stylesheets: 0,
            loading_indicators: 0,
            recent_mutations: 0,
            timer_activity: false,
            framework_loading: false,
            instrumented: true,
        }
    }

    #[test]
    fn test_calm_page_has_no_reasons() {
        assert!(calm().instability_reasons(5).is_empty());
    }

    #[test]
    fn test_timers_alone_do_not_block() {
        let signals = StabilitySignals {
            timer_activity: true,
            ..calm()
        };
        assert!(signals.instability_reasons(5).is_empty());
    }

    #[test]
    fn test_mutations_respect_threshold() {
        let at_threshold = StabilitySignals {
            recent_mutations: 5,
            ..calm()
        };
        assert!(at_threshold.instability_reasons(5).is_empty());

        let above = StabilitySignals {
            recent_mutations: 6,
            ..calm()
        };
        let reasons = above.instability_reasons(5);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("6 DOM mutation(s)"));
    }

    #[test]
    fn test_every_busy_signal_is_reported() {
        let busy = StabilitySignals {
            ready_state: "interactive".to_string(),
            pending_requests: 2,
            loading_images: 1,
            loading_stylesheets: 1,
            loading_indicators: 3,
            recent_mutations: 40,
            timer_activity: true,
            framework_loading: true,
            instrumented: true,
        };
        let reasons = busy.instability_reasons(5);
        assert_eq!(reasons.len(), 7);
        assert!(reasons[0].contains("'interactive'"));
        assert!(reasons[1].contains("2 network request(s)"));
    }

    #[test]
    fn test_signals_decode_from_page_json() {
        let value = serde_json::json!({
            "ready_state": "complete",
            "pending_requests": 1,
            "loading_images": 0,
            "loading_stylesheets": 0,
            "loading_indicators": 0,
            "recent_mutations": 2,
            "timer_activity": false,
            "framework_loading": false,
            "instrumented": true
        });
        let signals: StabilitySignals = serde_json::from_value(value).unwrap();
        assert_eq!(signals.pending_requests, 1);
        assert_eq!(signals.instability_reasons(5).len(), 1);
    }
}
