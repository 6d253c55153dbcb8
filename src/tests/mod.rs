use std::collections::HashSet;

use httpmock::prelude::*;

use crate::client::{ClientConfig, Fetcher};
use crate::exploit::{self, DEFAULT_XSS_PAYLOAD};
use crate::miner;
use crate::prober::ProbePolicy;
use crate::runner::{Options, Scanner};
use crate::scope::Target;
use crate::session::{ProbeMethod, Session};

fn fetcher() -> Fetcher {
    Fetcher::new(&ClientConfig::default()).unwrap()
}

fn scanner(base: &str) -> Scanner {
    Scanner::new(Options {
        target: base.to_string(),
        concurrency: 4,
        ..Options::default()
    })
    .unwrap()
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn html_links(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!("<a href=\"{l}\">link</a>"))
        .collect();
    format!("<html><body>{anchors}</body></html>")
}

#[tokio::test]
async fn discovery_keeps_success_pages_only() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/admin");
            then.status(200).body("Admin panel");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/login");
            then.status(200).body("Please sign in");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/xyz123");
            then.status(404).body("");
        })
        .await;

    let s = scanner(&server.base_url());
    let found = s.discover_paths(&words(&["admin", "login", "xyz123"])).await;

    assert_eq!(found, vec!["admin", "login"]);
    assert_eq!(s.session().paths(), vec!["admin", "login"]);
}

#[tokio::test]
async fn soft_404_bodies_are_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/missing");
            then.status(200).body("<h1>Page Not Found</h1>");
        })
        .await;

    let s = scanner(&server.base_url());
    assert!(s.discover_paths(&words(&["missing"])).await.is_empty());
    assert!(!s.session().has_paths());
}

#[tokio::test]
async fn custom_policy_changes_what_counts_as_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/moved");
            then.status(302).body("error: moved");
        })
        .await;

    let s = Scanner::new(Options {
        target: server.base_url(),
        policy: ProbePolicy::new(["gone"], 200..=399),
        client: ClientConfig {
            follow_redirects: false,
            ..ClientConfig::default()
        },
        ..Options::default()
    })
    .unwrap();
    assert_eq!(s.discover_paths(&words(&["moved"])).await, vec!["moved"]);
}

#[tokio::test]
async fn crawl_visits_each_page_once_and_probes_links() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .body(html_links(&["/a", "/b", "http://external.example/x"]));
        })
        .await;
    let page_a = server
        .mock_async(|when, then| {
            when.method(GET).path("/a");
            then.status(200).body(html_links(&["/b", "/"]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/b");
            then.status(200).body("<html><body>leaf</body></html>");
        })
        .await;

    let s = scanner(&server.base_url());
    let summary = s.crawl(2).await;

    let expected_visited: HashSet<String> = ["/", "/a", "/b"]
        .iter()
        .map(|p| server.url(*p))
        .collect();
    assert_eq!(s.session().visited(), expected_visited);
    let paths: HashSet<String> = s.session().paths().into_iter().collect();
    assert_eq!(paths, ["/a", "/b", "/"].iter().map(|p| p.to_string()).collect());
    assert_eq!(summary.visited, 3);
    assert_eq!(summary.probed, 3);
    assert_eq!(summary.found, 3);
    // one crawl fetch plus one probe
    assert_eq!(page_a.hits_async().await, 2);
}

#[tokio::test]
async fn crawl_stops_at_depth() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).body(html_links(&["/1"]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/1");
            then.status(200).body(html_links(&["/2"]));
        })
        .await;
    let page_2 = server
        .mock_async(|when, then| {
            when.method(GET).path("/2");
            then.status(200).body(html_links(&["/3"]));
        })
        .await;
    let page_3 = server
        .mock_async(|when, then| {
            when.method(GET).path("/3");
            then.status(200).body("leaf");
        })
        .await;

    let s = scanner(&server.base_url());
    s.crawl(2).await;

    let expected: HashSet<String> = [server.url("/"), server.url("/1")].into_iter().collect();
    assert_eq!(s.session().visited(), expected);
    // probed once, never expanded
    assert_eq!(page_2.hits_async().await, 1);
    assert_eq!(page_3.hits_async().await, 0);
}

#[tokio::test]
async fn crawl_with_zero_depth_does_nothing() {
    let server = MockServer::start_async().await;
    let root = server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).body(html_links(&["/a"]));
        })
        .await;

    let s = scanner(&server.base_url());
    let summary = s.crawl(0).await;

    assert!(s.session().visited().is_empty());
    assert_eq!(summary.probed, 0);
    assert_eq!(root.hits_async().await, 0);
}

#[tokio::test]
async fn crawl_does_not_expand_error_pages() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(500).body(html_links(&["/hidden"]));
        })
        .await;
    let hidden = server
        .mock_async(|when, then| {
            when.method(GET).path("/hidden");
            then.status(200).body("hidden");
        })
        .await;

    let s = scanner(&server.base_url());
    let summary = s.crawl(3).await;

    assert_eq!(summary.visited, 1);
    assert_eq!(hidden.hits_async().await, 0);
}

#[tokio::test]
async fn crawl_resolves_links_under_trailing_slash_target() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/app/");
            then.status(200).body(html_links(&["page2"]));
        })
        .await;
    let page_2 = server
        .mock_async(|when, then| {
            when.method(GET).path("/app/page2");
            then.status(200).body("second page");
        })
        .await;

    let s = scanner(&server.url("/app/"));
    let summary = s.crawl(2).await;

    let expected: HashSet<String> = [server.url("/app/"), server.url("/app/page2")]
        .into_iter()
        .collect();
    assert_eq!(s.session().visited(), expected);
    assert_eq!(s.session().paths(), vec!["/page2"]);
    assert_eq!(summary.found, 1);
    assert_eq!(page_2.hits_async().await, 2);
}

#[tokio::test]
async fn crawl_resolves_links_against_redirect_target() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/old");
            then.status(302).header("Location", server.url("/new/"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/new/");
            then.status(200).body(html_links(&["page"]));
        })
        .await;
    let page = server
        .mock_async(|when, then| {
            when.method(GET).path("/new/page");
            then.status(200).body("leaf");
        })
        .await;

    let s = scanner(&server.base_url());
    s.crawl_from(&server.url("/old"), 2).await;

    assert!(s.session().visited().contains(&server.url("/new/page")));
    assert_eq!(page.hits_async().await, 2);
}

#[tokio::test]
async fn echoed_post_parameter_is_reflected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("Welcome");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/").body_contains("id=127.0.0.1");
            then.status(200).body("Welcome 127.0.0.1");
        })
        .await;

    let session = Session::new();
    let url = server.url("/");
    let findings = miner::mine(&fetcher(), &session, &url, &words(&["id", "name"]), 2).await;

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].param, "id");
    assert_eq!(findings[0].method, ProbeMethod::Post);
    assert!(findings[0].differs);
    assert!(findings[0].reflected);
}

#[tokio::test]
async fn one_finding_per_param_and_method() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("base");
        })
        .await;
    let posts = server
        .mock_async(|when, then| {
            when.method(POST).path("/");
            then.status(200).body("changed");
        })
        .await;

    let session = Session::new();
    let url = server.url("/");
    let findings = miner::mine(&fetcher(), &session, &url, &words(&["a", "b"]), 2).await;

    assert_eq!(findings.len(), 2);
    // the empty value changed the body too, so every finding ends up reflected
    assert!(findings.iter().all(|f| f.method == ProbeMethod::Post && f.reflected));
    // every probe value was still sent
    assert_eq!(posts.hits_async().await, 10);
}

#[tokio::test]
async fn unreachable_baseline_mines_nothing() {
    let session = Session::new();
    let findings = miner::mine(
        &fetcher(),
        &session,
        "http://127.0.0.1:1/",
        &words(&["id"]),
        2,
    )
    .await;
    assert!(findings.is_empty());
    assert!(session.findings().is_empty());
}

#[tokio::test]
async fn mine_discovered_joins_paths_onto_target() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/search");
            then.status(200).body("Search page");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/search").body_contains("q=127.0.0.1");
            then.status(200).body("results for 127.0.0.1");
        })
        .await;

    let s = scanner(&server.base_url());
    assert_eq!(s.discover_paths(&words(&["search"])).await, vec!["search"]);
    assert_eq!(s.mine_discovered(&words(&["q"])).await, 1);

    let findings = s.session().findings_for(&server.url("/search"));
    assert_eq!(findings.len(), 1);
    assert!(findings[0].reflected);
}

#[tokio::test]
async fn command_injection_needs_uid_marker() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("nothing to see");
        })
        .await;

    let hits = exploit::test_command_injection(&fetcher(), &server.url("/"), "cmd").await;
    assert!(hits.is_empty());
}

#[tokio::test]
async fn command_injection_reports_matching_request() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/run").query_param("cmd", ";id");
            then.status(200)
                .body("uid=33(www-data) gid=33(www-data) groups=33(www-data)");
        })
        .await;

    let hits = exploit::test_command_injection(&fetcher(), &server.url("/run"), "cmd").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method, ProbeMethod::Get);
    assert_eq!(hits[0].payload, ";id");
}

#[tokio::test]
async fn command_injection_reports_form_post_hit() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/run").body_contains("cmd=%60id%60");
            then.status(200).body("uid=0(root) gid=0(root)");
        })
        .await;

    let hits = exploit::test_command_injection(&fetcher(), &server.url("/run"), "cmd").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method, ProbeMethod::Post);
    assert_eq!(hits[0].url, server.url("/run"));
    assert_eq!(hits[0].payload, "`id`");
}

#[tokio::test]
async fn xss_reports_form_post_echo() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/comment");
            then.status(200)
                .body(format!("<div>{DEFAULT_XSS_PAYLOAD}</div>"));
        })
        .await;

    let hits =
        exploit::test_xss(&fetcher(), &server.url("/comment"), "body", DEFAULT_XSS_PAYLOAD).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method, ProbeMethod::Post);
    assert_eq!(hits[0].param, "body");
}

#[tokio::test]
async fn xss_hit_requires_verbatim_echo() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/search").query_param("q", DEFAULT_XSS_PAYLOAD);
            then.status(200)
                .body(format!("<p>You searched for {DEFAULT_XSS_PAYLOAD}</p>"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/search");
            then.status(200)
                .body("<p>You searched for &lt;script&gt;alert('XSS')&lt;/script&gt;</p>");
        })
        .await;

    let hits =
        exploit::test_xss(&fetcher(), &server.url("/search"), "q", DEFAULT_XSS_PAYLOAD).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method, ProbeMethod::Get);
}

#[tokio::test]
async fn path_wordlist_can_be_fetched() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/common.txt");
            then.status(200).body("admin\n\nlogin\n  backup  \n");
        })
        .await;

    let s = scanner(&server.base_url());
    let source = crate::wordlist::WordlistSource::Url(server.url("/common.txt"));
    assert_eq!(s.load_wordlist(&source).await, vec!["admin", "login", "backup"]);

    let missing = crate::wordlist::WordlistSource::Url(server.url("/none.txt"));
    assert!(s.load_wordlist(&missing).await.is_empty());
}

#[test]
fn target_scope_matches_host_exactly() {
    let t = Target::parse("http://127.0.0.1:8080/").unwrap();
    assert!(t.in_scope("http://127.0.0.1:9090/other").unwrap());
    assert!(!t.in_scope("http://localhost:8080/").unwrap());
}
