use insta::assert_json_snapshot;
use serde_json::json;

use super::*;
use crate::{
    AttrValue, CredentialsReport, DecisionSet, ErrorKind, NodeType, PermissionPipeline,
    PipelineConfig, PrincipalPolicySet, Statement, WILDCARD, parse_credentials_report,
};

fn pipeline() -> PermissionPipeline {
    PermissionPipeline::new(PipelineConfig::default())
}

fn credentials() -> CredentialsReport {
    parse_credentials_report(
        &json!({
            ALICE: {"password_enabled": "true", "mfa_active": "false", "password_last_used": "N/A"},
            ROOT: {"password_enabled": "not_supported", "mfa_active": "true"},
        })
        .to_string(),
    )
    .unwrap()
}

#[test]
fn test_canonicalize_fixture() {
    let out = pipeline().canonicalize(&principals(), &catalog(), &dumps());

    let keys: Vec<&str> = out.merged.keys().collect();
    assert_eq!(keys, vec![ACCOUNT, DEVS, DEPLOYER, ALICE]);
    assert!(!out.merged.contains_key(BOB));
    assert!(!out.merged.contains_key(WILDCARD));

    assert_eq!(
        out.merged.statements(ALICE),
        &[
            Statement::new(["iam:ChangePassword"], ["*"]),
            Statement::new(["s3:Get*", "s3:List*"], ["*"]),
            Statement::new(["sqs:SendMessage"], [QUEUE]),
            Statement::new(["s3:ListBucket"], [BUCKET]),
        ]
    );
    assert_eq!(out.merged.statement_count(), 11);
    assert_eq!(
        out.merged.get(DEPLOYER).unwrap().details["AssumedBy"],
        json!([ALICE])
    );

    assert_eq!(out.identity.len(), 4);
    assert_eq!(out.resources.inventory.len(), 2);
    assert_eq!(out.report.count(ErrorKind::UnresolvedPrincipal), 1);
    assert_eq!(out.report.len(), 1);
}

#[test]
fn test_wildcard_grant_reaches_every_principal_once() {
    let out = pipeline().canonicalize(&principals(), &catalog(), &dumps());
    let wildcard = Statement::new(["s3:ListBucket"], [BUCKET]);
    for (key, entry) in &out.merged {
        let hits = entry.statements.iter().filter(|s| **s == wildcard).count();
        assert_eq!(hits, 1, "{key}");
    }
}

#[test]
fn test_output_independent_of_input_order() {
    let mut reversed_principals = principals();
    reversed_principals.reverse();
    let mut reversed_dumps = dumps();
    reversed_dumps.reverse();

    let first = pipeline().canonicalize(&principals(), &catalog(), &dumps());
    let second = pipeline().canonicalize(&reversed_principals, &catalog(), &reversed_dumps);
    assert_eq!(first.merged, second.merged);
    assert_eq!(
        first.merged.to_json_string().unwrap(),
        second.merged.to_json_string().unwrap()
    );
}

#[test]
fn test_malformed_statements_do_not_stop_the_run() {
    let mut dumps = dumps();
    dumps.push(ServiceDump::new(
        "kms",
        json!({ "arn:aws:kms:eu-west-1:123456789012:key/k": {"Policy": document(vec![
            json!({"Effect": "Allow", "Principal": {"AWS": BOB}}),
            grant(json!(BOB), json!("kms:Decrypt")),
        ])}}),
    ));
    dumps.push(ServiceDump::new("broken", json!("not a dump")));

    let out = pipeline().canonicalize(&principals(), &catalog(), &dumps);
    assert_eq!(out.report.count(ErrorKind::Malformed), 2);
    assert_eq!(
        out.merged.statements(BOB),
        &[
            Statement::new(["kms:Decrypt"], ["arn:aws:kms:eu-west-1:123456789012:key/k"]),
            Statement::new(["s3:ListBucket"], [BUCKET]),
        ]
    );
}

#[test]
fn test_evaluate_fixture() {
    let pipeline = pipeline();
    let canonical = pipeline.canonicalize(&principals(), &catalog(), &dumps());
    let out = pipeline.evaluate(&canonical, Some(&credentials()), &fixture_oracle);

    assert!(out.report.is_empty());
    assert_eq!(out.others.keys().collect::<Vec<_>>(), vec![ACCOUNT]);
    assert!(out.principals.contains_key(ROOT));
    assert!(out.decisions.get(ROOT).is_none());

    let alice = out.decisions.get(ALICE).unwrap();
    assert_eq!(alice.allowed.len(), 4);
    assert_eq!(alice.explicit_deny.len(), 1);
    assert_eq!(out.decisions.get(DEPLOYER).unwrap().implicit_deny.len(), 1);

    assert_eq!(out.graph.edges.len(), 10);
    assert_eq!(out.graph.nodes.len(), 9);
    assert_eq!(out.graph.node(ROOT).unwrap().node_type, NodeType::Unknown);
    assert_eq!(out.graph.nodes_of_type(NodeType::Resource).count(), 4);
    assert!(out.graph.edges.iter().all(|e| e.relationship.label != "ChangePassword"));

    let alice_node = out.graph.node(ALICE).unwrap();
    assert_eq!(alice_node.attr("password_enabled"), Some(&AttrValue::Bool(true)));
    assert_eq!(alice_node.attr("mfa_active"), Some(&AttrValue::Bool(false)));
    assert_eq!(alice_node.attr("password_last_used"), Some(&AttrValue::Null));
    assert!(alice_node.attr(crate::PERMISSIONS).is_some());

    let queue = out.graph.node(QUEUE).unwrap();
    assert_eq!(queue.attr("Name"), Some(&AttrValue::from("jobs")));
}

#[test]
fn test_statementless_principals_still_become_nodes() {
    let pipeline = pipeline();
    let canonical = pipeline.canonicalize(&principals(), &catalog(), &dumps());
    let out = pipeline.evaluate(&canonical, None, &fixture_oracle);

    let bob = out.graph.node(BOB).unwrap();
    assert_eq!(bob.node_type, NodeType::User);
    assert_eq!(bob.attr("FriendlyName"), Some(&AttrValue::from("bob")));
    assert!(bob.attr(crate::PERMISSIONS).is_none());
    assert_eq!(out.graph.edges_from(BOB).count(), 0);
    assert!(out.decisions.get(BOB).is_none());
    assert!(!canonical.merged.contains_key(BOB));
    assert_eq!(out.graph.nodes.len(), 8);
}

#[test]
fn test_statementless_non_principal_keys_are_not_carried() {
    let mut principals = principals();
    principals.push(RawPrincipal::new("legacy-import").with_friendly_name("legacy"));

    let pipeline = pipeline();
    let canonical = pipeline.canonicalize(&principals, &catalog(), &dumps());
    assert!(canonical.identity.contains_key("legacy-import"));

    let out = pipeline.evaluate(&canonical, None, &fixture_oracle);
    assert!(out.graph.node("legacy-import").is_none());
    assert!(out.graph.node(BOB).is_some());
}

#[test]
fn test_resource_grant_keeps_identity_details() {
    let trusted_only = "arn:aws:iam::123456789012:role/auditor";
    let mut principals = principals();
    principals.push(
        RawPrincipal::new(trusted_only)
            .with_friendly_name("auditor")
            .with_trust_policy(json!({"Statement": [
                {"Effect": "Allow", "Principal": {"AWS": BOB}, "Action": "sts:AssumeRole"}
            ]})),
    );
    let mut dumps = dumps();
    dumps.push(ServiceDump::new(
        "s3",
        json!({ "arn:aws:s3:::audit": {"Policy": document(vec![
            grant(json!(trusted_only), json!("s3:GetObject")),
        ])}}),
    ));

    let out = pipeline().canonicalize(&principals, &catalog(), &dumps);
    let entry = out.merged.get(trusted_only).unwrap();
    assert_eq!(
        entry.statements,
        vec![Statement::new(["s3:GetObject"], ["arn:aws:s3:::audit"])]
    );
    assert_eq!(entry.details["FriendlyName"], json!("auditor"));
    assert_eq!(entry.details["AssumedBy"], json!([BOB]));
}

#[test]
fn test_edge_emission_order() {
    let pipeline = pipeline();
    let canonical = pipeline.canonicalize(&principals(), &catalog(), &dumps());
    let out = pipeline.evaluate(&canonical, None, &fixture_oracle);

    let deployer_edges: Vec<_> = out.graph.edges_from(DEPLOYER).collect();
    assert_json_snapshot!(deployer_edges, @r#"
    [
      {
        "source": "arn:aws:iam::123456789012:role/deployer",
        "target": "arn:aws:s3:::reports/*",
        "relationship": {
          "type": "PutObject",
          "service": "s3"
        }
      },
      {
        "source": "arn:aws:iam::123456789012:role/deployer",
        "target": "arn:aws:s3:::reports",
        "relationship": {
          "type": "GetObject",
          "service": "s3"
        }
      },
      {
        "source": "arn:aws:iam::123456789012:role/deployer",
        "target": "arn:aws:s3:::reports",
        "relationship": {
          "type": "ListBucket",
          "service": "s3"
        }
      }
    ]
    "#);

    let sources: Vec<&str> = out.graph.edges.iter().map(|e| e.source.as_str()).collect();
    let mut sorted = sources.clone();
    sorted.sort();
    assert_eq!(sources, sorted);
}

#[test]
fn test_build_from_exported_documents() {
    let identity = PrincipalPolicySet::from_json_str(
        &json!({
            ALICE: {
                "FriendlyName": "alice",
                "MemberOf": [],
                "AttachedPolicies": {"InlinePolicies": [], "ManagedPolicies": []},
                "Statements": [[["s3:GetObject"], ["arn:aws:s3:::bucket/key"]]]
            }
        })
        .to_string(),
    )
    .unwrap();
    let decisions = DecisionSet::from_json_str(
        &json!({
            ALICE: {
                "allowed": [["s3:GetObject", "arn:aws:s3:::bucket/key"]],
                "explicitDeny": [["s3:DeleteObject", "arn:aws:s3:::bucket/key"]],
                "implicitDeny": []
            }
        })
        .to_string(),
    )
    .unwrap();

    let graph = pipeline().build(&identity, &decisions);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].relationship.label, "GetObject");
    assert_eq!(graph.edges[0].relationship.service, "s3");
    assert_eq!(graph.edges[0].target, "arn:aws:s3:::bucket/key");
    assert_eq!(
        graph.node(ALICE).unwrap().attr("AttachedPolicies"),
        Some(&AttrValue::from(r#"{"InlinePolicies":[],"ManagedPolicies":[]}"#))
    );
}

#[test]
fn test_pipeline_from_config_str() {
    let pipeline = PermissionPipeline::from_config_str(r#"{"attachDecisions": false}"#).unwrap();
    assert!(!pipeline.config().attach_decisions);

    let canonical = pipeline.canonicalize(&principals(), &catalog(), &dumps());
    let out = pipeline.evaluate(&canonical, None, &fixture_oracle);
    assert!(out.graph.nodes.iter().all(|n| n.attr(crate::PERMISSIONS).is_none()));

    assert!(PermissionPipeline::from_config_str("[]").is_err());
}

#[test]
fn test_empty_inputs() {
    let pipeline = pipeline();
    let canonical = pipeline.canonicalize(&[], &crate::ManagedPolicyCatalog::new(), &[]);
    assert!(canonical.merged.is_empty());
    let out = pipeline.evaluate(&canonical, None, &fixture_oracle);
    assert!(out.graph.nodes.is_empty());
    assert!(out.graph.edges.is_empty());
}
