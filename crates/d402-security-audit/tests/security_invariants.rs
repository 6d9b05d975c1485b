//! Security invariant tests for the d402 admission gateway.
//!
//! These scan the production sources of the workspace crates and fail when a
//! change weakens the admission path: redirects on outbound clients, ad-hoc
//! secret comparison, panics on the request path, fail-open verification.

use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// Read all .rs source files from production crates (excluding tests and this crate).
fn production_source_files() -> Vec<(String, String)> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap();

    let crates_dir = root.join("crates");
    let mut files = Vec::new();

    for entry in WalkDir::new(&crates_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }

        let path_str = path.to_str().unwrap_or("");
        if path_str.contains("security-audit") {
            continue;
        }
        if path_str.contains("tests/") || path_str.contains("\\tests\\") {
            continue;
        }

        if let Ok(content) = std::fs::read_to_string(path) {
            files.push((path_str.to_string(), content));
        }
    }

    files
}

/// Everything before the first `#[cfg(test)]` / `mod tests` in a file.
fn production_lines(content: &str) -> String {
    let mut result = Vec::new();

    for line in content.lines() {
        if line.contains("#[cfg(test)]") || line.trim().starts_with("mod tests") {
            break;
        }
        result.push(line);
    }

    result.join("\n")
}

fn file_named<'a>(files: &'a [(String, String)], suffix: &str) -> Option<&'a str> {
    files
        .iter()
        .find(|(path, _)| path.replace('\\', "/").ends_with(suffix))
        .map(|(_, content)| content.as_str())
}

/// Body of `fn name` up to the next top-level item.
fn function_body<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let start = content.find(&format!("fn {name}"))?;
    let rest = &content[start..];
    let end = rest[1..]
        .find("\n}")
        .map(|i| i + 3)
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

#[test]
fn sources_are_found() {
    let files = production_source_files();
    assert!(file_named(&files, "d402/src/admission.rs").is_some());
    assert!(file_named(&files, "d402-gateway/src/middleware.rs").is_some());
}

#[test]
fn no_hardcoded_private_keys_in_production_code() {
    let hex_64_re = Regex::new(r"0x[a-fA-F0-9]{64}").unwrap();

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);
        if let Some(mat) = hex_64_re.find(&prod_content) {
            let line_num = prod_content[..mat.start()].lines().count() + 1;
            panic!(
                "Potential hardcoded secret found at {}:{}: {}",
                path,
                line_num,
                mat.as_str()
            );
        }
    }
}

#[test]
fn http_clients_disable_redirects() {
    let builder_re = Regex::new(r"reqwest::Client::builder\(\)").unwrap();
    let redirect_re = Regex::new(r"redirect\s*\(\s*.*Policy::none\(\)").unwrap();
    let mut builders = 0;

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);

        for mat in builder_re.find_iter(&prod_content) {
            builders += 1;
            let search_end = (mat.end() + 500).min(prod_content.len());
            let builder_chain = &prod_content[mat.start()..search_end];

            assert!(
                redirect_re.is_match(builder_chain),
                "reqwest::Client::builder() at {} does not set redirect(Policy::none()). \
                 Outbound clients must not follow redirects.",
                path
            );
        }
    }

    // The facilitator client and the upstream proxy client.
    assert!(builders >= 2, "expected at least two reqwest client builders, found {builders}");
}

#[test]
fn constant_time_uses_subtle_crate() {
    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);

        if prod_content.contains("fn constant_time_eq") {
            assert!(
                prod_content.contains("subtle::") || prod_content.contains("use subtle"),
                "File {} defines constant_time_eq without the subtle crate. \
                 Use d402::security::constant_time_eq.",
                path
            );
        }
    }
}

#[test]
fn secrets_are_never_compared_with_eq() {
    let naive_re =
        Regex::new(r"(secret|api_key|credential|token)[a-z_]*\s*==|==\s*[a-z_.]*(secret|api_key|token)").unwrap();

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);
        for (i, line) in prod_content.lines().enumerate() {
            assert!(
                !naive_re.is_match(line),
                "Possible non-constant-time secret comparison at {}:{}: {}",
                path,
                i + 1,
                line.trim()
            );
        }
    }
}

#[test]
fn facilitator_requests_are_signed_with_hmac_crate() {
    let files = production_source_files();
    let hmac = file_named(&files, "d402/src/hmac.rs").expect("hmac.rs not found");
    let func_text = function_body(hmac, "compute_hmac").expect("compute_hmac not found");
    assert!(
        func_text.contains("HmacSha256::new_from_slice"),
        "compute_hmac must use the hmac crate"
    );

    let client = file_named(&files, "d402/src/facilitator_client.rs")
        .expect("facilitator_client.rs not found");
    assert!(
        client.contains("compute_hmac(secret, body)"),
        "facilitator requests must carry an HMAC over the exact body sent"
    );
}

#[test]
fn request_path_does_not_panic() {
    let files = production_source_files();
    let request_path = [
        "d402/src/admission.rs",
        "d402/src/verifier.rs",
        "d402/src/facilitator_client.rs",
        "d402/src/proof.rs",
        "d402-gateway/src/middleware.rs",
        "d402-gateway/src/proxy.rs",
        "d402-gateway/src/routes/tools.rs",
    ];
    let panic_re = Regex::new(r"\.unwrap\(\)|\.expect\(|panic!\(|todo!\(").unwrap();

    for suffix in request_path {
        let content = file_named(&files, suffix).unwrap_or_else(|| panic!("{suffix} not found"));
        let prod_content = production_lines(content);
        for (i, line) in prod_content.lines().enumerate() {
            assert!(
                !panic_re.is_match(line),
                "Panicking call on the request path at {}:{}: {}",
                suffix,
                i + 1,
                line.trim()
            );
        }
    }
}

#[test]
fn prechecks_run_before_the_verifier() {
    let files = production_source_files();
    let verifier = file_named(&files, "d402/src/verifier.rs").expect("verifier.rs not found");
    let body = function_body(verifier, "verify_payment").expect("verify_payment not found");

    let precheck = body.find("precheck(").expect("verify_payment must call precheck");
    let remote = body.find(".verify(").expect("verify_payment must call the verifier");
    assert!(
        precheck < remote,
        "verify_payment must run local prechecks before contacting the verifier"
    );
}

#[test]
fn testing_mode_is_opt_in() {
    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);
        for (i, line) in prod_content.lines().enumerate() {
            if line.contains("TESTING_MODE") || line.contains("testing_mode") {
                assert!(
                    !line.contains("unwrap_or(true)") && !line.contains("None => true"),
                    "Testing mode must default to off ({}:{}): {}",
                    path,
                    i + 1,
                    line.trim()
                );
            }
        }
    }

    let files = production_source_files();
    let config = file_named(&files, "d402-gateway/src/config.rs").expect("config.rs not found");
    assert!(
        config.contains("MissingRequired(\"FACILITATOR_URL\")"),
        "production mode without a facilitator URL must be a configuration error"
    );
}

#[test]
fn challenge_bodies_do_not_leak_verifier_detail() {
    let dangerous_patterns = ["invalid_reason", "detail", "backtrace", "RUST_BACKTRACE"];

    for (path, content) in &production_source_files() {
        if !content.contains("HttpResponse::") {
            continue;
        }
        let prod_content = production_lines(content);

        for (i, line) in prod_content.lines().enumerate() {
            for pattern in &dangerous_patterns {
                if line.contains(pattern) && line.contains("json") {
                    panic!(
                        "Potentially sensitive detail '{}' in an HTTP response at {}:{}. \
                         Verifier and transport details belong in logs only.",
                        pattern,
                        path,
                        i + 1
                    );
                }
            }
        }
    }
}
