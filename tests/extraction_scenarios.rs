use mail_otp::{extract, extract_with_defaults, CodeExtractor, DetectionConfig, PatternRule};
use std::sync::Arc;
use std::thread;

#[test]
fn chinese_verification_code_is_high_confidence() {
    let result = extract_with_defaults("", "您的验证码是 123456，请在10分钟内使用");
    assert!(result.high_confidence.contains(&"123456".to_string()));
}

#[test]
fn order_number_is_not_trusted() {
    let result = extract_with_defaults("Order confirmation", "Your order #987654 has shipped");
    assert!(!result.high_confidence.contains(&"987654".to_string()));
}

#[test]
fn html_alphanumeric_code() {
    let result = extract_with_defaults("", "<b>Code:</b> AB12-CD");
    assert_eq!(result.high_confidence, vec!["AB12CD"]);
    let debug = &result.debug[0];
    assert_eq!(debug.code, "AB12CD");
    assert!(debug.contexts.iter().all(|c| c.contains("AB12-CD")));
}

#[test]
fn empty_message_gives_empty_result() {
    let result = extract_with_defaults("", "");
    assert!(result.high_confidence.is_empty());
    assert!(result.low_confidence.is_empty());
    assert!(result.debug.is_empty());
}

#[test]
fn plain_and_bracketed_hits_merge() {
    let config = DetectionConfig {
        patterns: vec![
            PatternRule::new(
                "numeric",
                r"(?:^|[^0-9A-Za-z])((?:[0-9][\s-]?){4,8})(?:[^0-9A-Za-z]|$)",
                Some(1),
            ),
            PatternRule::new(
                "wrapped",
                r"[【(\[{]([A-Za-z0-9][A-Za-z0-9\s-]{3,9}[A-Za-z0-9])[】)\]}]",
                Some(1),
            ),
        ],
        ..DetectionConfig::default()
    };
    let result = extract("Your login code", "Use 482913 (482913) to sign in", &config);
    assert_eq!(result.debug.len(), 1);
    assert_eq!(result.debug[0].patterns.len(), 2);
    assert_eq!(result.high_confidence, vec!["482913"]);
}

#[test]
fn length_and_digit_filters() {
    let body = "ids: 123, 12345678901, ABCDE, [QWERTY], 4455";
    let result = extract_with_defaults("verification", body);
    let all: Vec<&String> = result
        .high_confidence
        .iter()
        .chain(result.low_confidence.iter())
        .collect();
    assert_eq!(all, vec!["4455"]);
}

#[test]
fn html_mail_with_styles_and_entities() {
    let body = r#"<html><head><style>td { color: #333333; }</style></head>
        <body><table><tr><td>Hi there,</td></tr>
        <tr><td>Your security code is&nbsp;<strong>&#52;&#56;&#50;&#57;&#49;&#51;</strong></td></tr>
        <tr><td>Customer service: 400-800-8888</td></tr></table></body></html>"#;
    let result = extract_with_defaults("Sign-in attempt", body);
    assert_eq!(result.high_confidence.first().map(String::as_str), Some("482913"));
    assert!(!result.high_confidence.contains(&"333333".to_string()));
}

#[test]
fn partition_respects_threshold() {
    let config = DetectionConfig::default();
    let bodies = [
        "您的验证码是 123456。订单号 20240101 电话 13800138000",
        "Tracking 1Z999AA10123456784 arrives 2024-05-06, code 7788",
        "Invoice 5521-3340 amount 99.00 USD",
    ];
    for body in bodies {
        let result = extract("", body, &config);
        for debug in &result.debug {
            let high = result.high_confidence.contains(&debug.code);
            let low = result.low_confidence.contains(&debug.code);
            assert_eq!(high, debug.score >= config.score_threshold, "{body}");
            assert_eq!(low, debug.score < config.score_threshold, "{body}");
        }
    }
}

#[test]
fn shared_extractor_across_threads() {
    let extractor = Arc::new(CodeExtractor::default());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let extractor = Arc::clone(&extractor);
            thread::spawn(move || extractor.extract("登录验证", "校验码：665544"))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for result in &results {
        assert_eq!(result, &results[0]);
        assert_eq!(result.high_confidence, vec!["665544"]);
    }
}
