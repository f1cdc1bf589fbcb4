//! Cross-module tests: the full pipeline over a small fixture account.

use serde_json::{Value, json};

use crate::{
    EvalDecision, ManagedPolicyCatalog, PermGraphError, RawPrincipal, ServiceDump,
    SimulationRequest, SimulationResult,
};

mod pipeline;

const ACCOUNT: &str = "123456789012";
const ALICE: &str = "arn:aws:iam::123456789012:user/alice";
const BOB: &str = "arn:aws:iam::123456789012:user/bob";
const DEVS: &str = "arn:aws:iam::123456789012:group/devs";
const DEPLOYER: &str = "arn:aws:iam::123456789012:role/deployer";
const ROOT: &str = "arn:aws:iam::123456789012:root";
const READ_ONLY: &str = "arn:aws:iam::aws:policy/ReadOnlyAccess";
const BUCKET: &str = "arn:aws:s3:::reports";
const QUEUE: &str = "arn:aws:sqs:eu-west-1:123456789012:jobs";

fn document(statements: Vec<Value>) -> Value {
    json!({"Version": "2012-10-17", "Statement": statements})
}

fn allow(action: Value, resource: Value) -> Value {
    json!({"Effect": "Allow", "Action": action, "Resource": resource})
}

fn grant(principal: Value, action: Value) -> Value {
    json!({"Effect": "Allow", "Principal": {"AWS": principal}, "Action": action, "Resource": "*"})
}

fn principals() -> Vec<RawPrincipal> {
    vec![
        RawPrincipal::new(ALICE)
            .with_friendly_name("alice")
            .with_inline_policy("own", document(vec![allow(json!("iam:ChangePassword"), json!("*"))]))
            .member_of(DEVS),
        RawPrincipal::new(BOB).with_friendly_name("bob"),
        RawPrincipal::new(DEVS)
            .with_friendly_name("devs")
            .with_managed_policy(READ_ONLY),
        RawPrincipal::new(DEPLOYER)
            .with_friendly_name("deployer")
            .with_inline_policy(
                "deploy",
                document(vec![allow(json!(["cloudformation:*", "s3:PutObject"]), json!(format!("{BUCKET}/*")))]),
            )
            .with_trust_policy(json!({"Statement": [
                {"Effect": "Allow", "Principal": {"AWS": ALICE}, "Action": "sts:AssumeRole"}
            ]})),
    ]
}

fn catalog() -> ManagedPolicyCatalog {
    let records = vec![(
        READ_ONLY.to_string(),
        json!({"Path": "/", "IsAttachable": true, "Document": document(vec![
            allow(json!(["s3:Get*", "s3:List*"]), json!("*")),
        ])}),
    )];
    ManagedPolicyCatalog::from_records(records).0
}

fn dumps() -> Vec<ServiceDump> {
    vec![
        ServiceDump::new(
            "s3",
            json!({ BUCKET: {"Policy": document(vec![
                grant(json!(DEPLOYER), json!("s3:GetObject")),
                grant(json!("*"), json!("s3:ListBucket")),
                json!({"Effect": "Allow", "Principal": {"Service": "logging.s3.amazonaws.com"}, "Action": "s3:PutObject"}),
            ]).to_string()} }),
        ),
        ServiceDump::new(
            "sqs",
            json!({ QUEUE: [{"Name": "jobs", "QueueUrl": "https://sqs.eu-west-1.amazonaws.com/123456789012/jobs", "Policies": {
                "send": document(vec![grant(json!([ALICE, ACCOUNT]), json!("sqs:SendMessage"))]),
            }}] }),
        ),
    ]
}

/// Allows `s3:` and `sqs:` actions, explicitly denies `iam:`, implicitly
/// denies everything else. Results echo each requested resource, or `*`
/// when none was given.
fn fixture_oracle(request: &SimulationRequest<'_>) -> Result<Vec<SimulationResult>, PermGraphError> {
    let resources: Vec<&str> = if request.resources.is_empty() {
        vec!["*"]
    } else {
        request.resources.iter().map(String::as_str).collect()
    };
    let mut out = Vec::new();
    for action in request.actions {
        let decision = if action.starts_with("s3:") || action.starts_with("sqs:") {
            EvalDecision::Allowed
        } else if action.starts_with("iam:") {
            EvalDecision::ExplicitDeny
        } else {
            EvalDecision::ImplicitDeny
        };
        for resource in &resources {
            out.push(SimulationResult::new(action.as_str(), *resource, decision));
        }
    }
    Ok(out)
}
