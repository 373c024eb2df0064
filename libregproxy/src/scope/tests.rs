use super::*;

#[test]
fn test_ping_scope() {
    assert_eq!(determine_scope("/v2/"), Some("any".to_string()));
}

#[test]
fn test_manifest_scope() {
    assert_eq!(
        determine_scope("/v2/library/alpine/manifests/latest"),
        Some("repository:library/alpine:pull".to_string())
    );
}

#[test]
fn test_manifest_by_digest_scope() {
    assert_eq!(
        determine_scope("/v2/alpine/manifests/sha256:c5b1261d6d3e43071626931fc004f70149baeba2c8ec672bd4f27761f8e1ad6b"),
        Some("repository:alpine:pull".to_string())
    );
}

#[test]
fn test_blob_scope() {
    assert_eq!(
        determine_scope("/v2/library/alpine/blobs/sha256:f18232174bc91741fdf3da96d85011092101a032a93a388b79e99e69c2d5c870"),
        Some("repository:library/alpine:pull".to_string())
    );
}

#[test]
fn test_tags_list_scope() {
    assert_eq!(
        determine_scope("/v2/library/alpine/tags/list"),
        Some("repository:library/alpine:pull".to_string())
    );
}

#[test]
fn test_tags_list_requires_exact_suffix() {
    assert_eq!(determine_scope("/v2/library/alpine/tags/list/extra"), None);
    assert_eq!(determine_scope("/v2/library/alpine/tags/"), None);
}

#[test]
fn test_deeply_nested_repository() {
    assert_eq!(
        determine_scope("/v2/org/team/project/app/manifests/v1.2.3"),
        Some("repository:org/team/project/app:pull".to_string())
    );
}

#[test]
fn test_catalog_has_no_scope() {
    assert_eq!(determine_scope("/v2/_catalog"), None);
}

#[test]
fn test_upload_path_only_gets_pull() {
    // Upload URLs sit under /blobs/ and still resolve to a pull scope; pushes
    // are rejected earlier by the method gate.
    assert_eq!(
        determine_scope("/v2/library/alpine/blobs/uploads/"),
        Some("repository:library/alpine:pull".to_string())
    );
}

#[test]
fn test_unknown_endpoint_has_no_scope() {
    assert_eq!(determine_scope("/v2/library/alpine/referrers/sha256:abc"), None);
}

#[test]
fn test_non_registry_paths() {
    assert_eq!(determine_scope("/"), None);
    assert_eq!(determine_scope("/v2"), None);
    assert_eq!(determine_scope("/v1/library/alpine/manifests/latest"), None);
    assert_eq!(determine_scope("/health"), None);
    assert_eq!(determine_scope(""), None);
}

#[test]
fn test_empty_repository_segment_does_not_match() {
    assert_eq!(determine_scope("/v2//manifests/latest"), None);
}

#[test]
fn test_blobs_pattern_wins_over_manifests() {
    // Patterns are tried in order; the blob pattern captures the longest repo prefix.
    assert_eq!(
        determine_scope("/v2/odd/manifests/repo/blobs/sha256:abc"),
        Some("repository:odd/manifests/repo:pull".to_string())
    );
}

#[test]
fn test_pull_scope_format() {
    assert_eq!(pull_scope("nginx"), "repository:nginx:pull");
}
