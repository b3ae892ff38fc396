use super::*;
use pretty_assertions::assert_eq;

const FULL_RESPONSE: &str = r#"
<Steps>
1. Open the search box
2. Type the query
</Steps>
<Thought>The search input is element 12.</Thought>
<Action>setValue(12, "rust async book\n")</Action>
<Validator>InProgress</Validator>
"#;

#[test]
fn test_parse_full_response() {
    let response = parse_response(FULL_RESPONSE).unwrap();
    assert_eq!(
        response.steps.as_deref(),
        Some("1. Open the search box\n2. Type the query")
    );
    assert_eq!(response.thought, "The search input is element 12.");
    assert_eq!(response.validator.as_deref(), Some("InProgress"));
    assert_eq!(
        response.action,
        ParsedAction::SetValue {
            element_id: ElementHandle(12),
            value: "rust async book\n".to_string(),
        }
    );
}

#[test]
fn test_tags_are_case_insensitive_and_optional() {
    let response = parse_response("<ACTION> click( 7 ) </action>").unwrap();
    assert_eq!(
        response.action,
        ParsedAction::Click {
            element_id: ElementHandle(7)
        }
    );
    assert_eq!(response.steps, None);
    assert_eq!(response.thought, "");
    assert_eq!(response.validator, None);
}

#[test]
fn test_missing_action_tag() {
    assert_eq!(
        parse_response("<Thought>nothing to do</Thought>").unwrap_err(),
        PlanParseError::MissingTag("Action")
    );
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        parse_action(r#"respond('It\'s "done"\\ok')"#).unwrap(),
        ParsedAction::Respond {
            message: "It's \"done\"\\ok".to_string()
        }
    );
    assert_eq!(
        parse_action(r#"memory("a, b\tc")"#).unwrap(),
        ParsedAction::Memory {
            message: "a, b\tc".to_string()
        }
    );
}

#[test]
fn test_bare_arguments() {
    assert_eq!(
        parse_action("navigate(https://example.com/a?b=1)").unwrap(),
        ParsedAction::Navigate {
            url: "https://example.com/a?b=1".to_string()
        }
    );
    assert_eq!(
        parse_action("waiting(2.5)").unwrap(),
        ParsedAction::Waiting { seconds: 2.5 }
    );
    assert_eq!(
        parse_action("click(\"42\")").unwrap(),
        ParsedAction::Click {
            element_id: ElementHandle(42)
        }
    );
    assert_eq!(parse_action("finish()").unwrap(), ParsedAction::Finish);
}

#[test]
fn test_unknown_action() {
    assert_eq!(
        parse_action("hover(3)").unwrap_err(),
        PlanParseError::UnknownAction("hover".to_string())
    );
}

#[test]
fn test_arity_and_type_errors() {
    assert!(matches!(
        parse_action("click()").unwrap_err(),
        PlanParseError::Arity { expected: 1, found: 0, .. }
    ));
    assert!(matches!(
        parse_action("finish(1)").unwrap_err(),
        PlanParseError::Arity { expected: 0, found: 1, .. }
    ));
    assert!(matches!(
        parse_action("click(1.5)").unwrap_err(),
        PlanParseError::ArgumentType { .. }
    ));
    assert!(matches!(
        parse_action("click(-3)").unwrap_err(),
        PlanParseError::ArgumentType { .. }
    ));
    assert!(matches!(
        parse_action("waiting(soon)").unwrap_err(),
        PlanParseError::ArgumentType { .. }
    ));
}

#[test]
fn test_syntax_errors() {
    for bad in [
        "click",
        "click(3",
        "setValue(3, \"open)",
        "setValue(3,)",
        "setValue(, 3)",
        "respond(\"a\" \"b\")",
        "(3)",
    ] {
        assert!(
            matches!(parse_action(bad), Err(PlanParseError::Syntax { .. })),
            "expected syntax error for {bad}"
        );
    }
}

#[test]
fn test_into_request_only_for_executable_actions() {
    assert_eq!(
        ParsedAction::Waiting { seconds: 1.0 }.into_request(),
        Some(ActionRequest::Waiting { seconds: 1.0 })
    );
    assert_eq!(ParsedAction::Finish.into_request(), None);
    assert_eq!(
        ParsedAction::Memory {
            message: "x".to_string()
        }
        .into_request(),
        None
    );
}

#[tokio::test]
async fn test_scripted_planner_replays_in_order() {
    let planner = ScriptedPlanner::parse_script(
        "<Action>click(1)</Action>\n---\n\n---\n<Action>finish()</Action>\n",
    );
    assert_eq!(planner.remaining().await, 2);

    let request = PlannerRequest {
        task: "t".to_string(),
        url: None,
        snapshot: String::new(),
        previous_actions: Vec::new(),
        memory: Vec::new(),
    };
    assert!(planner.plan(&request).await.unwrap().contains("click(1)"));
    assert!(planner.plan(&request).await.unwrap().contains("finish()"));
    assert!(planner.plan(&request).await.is_err());
}

#[test]
fn test_scripted_planner_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("responses.txt");
    std::fs::write(&path, "<Action>waiting(1)</Action>").unwrap();
    assert!(ScriptedPlanner::from_file(&path).is_ok());
    assert!(ScriptedPlanner::from_file(&dir.path().join("missing.txt")).is_err());
}
