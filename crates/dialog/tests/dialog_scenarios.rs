//! Dialog scenarios: slot filling, contact and discovery flows, and whole
//! rules driven through a session.

use rulecraft_core::ids::SequentialIds;
use rulecraft_core::in_memory::{AddressEntry, InMemoryAddressBook, InMemorySchemas, StaticDiscovery};
use rulecraft_core::{
    ChannelSchema, ChannelType, Command, Comparison, DiscoveredDevice, EventBus, Intent,
    Invocation, Reply, SchemaRegistry, Scope, Slot, Type, Value, ValueCategory,
};
use rulecraft_dialog::{
    Capabilities, DialogSettings, FlowOutcome, Resolution, Session, Turn, resolve_invocation,
};
use std::sync::Arc;

fn registry() -> InMemorySchemas {
    let mut schemas = InMemorySchemas::with_builtins();
    schemas.insert(ChannelSchema::new(
        "sensor",
        "reading",
        ChannelType::Trigger,
        vec![
            Slot::new("a", Type::String).required(),
            Slot::new("b", Type::Number),
            Slot::new("c", Type::Measure("C".into()))
                .required()
                .with_question("Above what temperature?"),
        ],
    ));
    schemas.insert(
        ChannelSchema::new(
            "email",
            "send",
            ChannelType::Action,
            vec![
                Slot::new("to", Type::EmailAddress).required(),
                Slot::new("body", Type::String).required(),
            ],
        )
        .global()
        .with_confirmation("send an email to $to"),
    );
    schemas
}

fn caps(confirm: bool) -> Capabilities {
    let book = InMemoryAddressBook::new(vec![
        AddressEntry {
            name: "Alice".into(),
            email: Some("alice@example.com".into()),
            phone: None,
        },
        AddressEntry {
            name: "Bob Smith".into(),
            email: Some("bob@example.com".into()),
            phone: None,
        },
        AddressEntry {
            name: "Bob Jones".into(),
            email: Some("jones@example.com".into()),
            phone: None,
        },
    ]);
    let nearby = vec![
        DiscoveredDevice {
            id: "scale-1".into(),
            kind: "com.example.scale".into(),
            name: "Kitchen Scale".into(),
            description: String::new(),
        },
        DiscoveredDevice {
            id: "scale-2".into(),
            kind: "com.example.scale".into(),
            name: "Bathroom Scale".into(),
            description: String::new(),
        },
    ];
    Capabilities::new(Arc::new(registry()))
        .with_ids(Arc::new(SequentialIds::new()))
        .with_address_book(Arc::new(book))
        .with_discovery(Arc::new(StaticDiscovery::new(nearby)))
        .with_settings(DialogSettings {
            confirm_programs: confirm,
            ..Default::default()
        })
}

fn session(confirm: bool) -> Session {
    Session::new(Arc::new(caps(confirm)), Arc::new(EventBus::default()))
}

fn last_question(replies: &[Reply]) -> (ValueCategory, String) {
    match replies.last() {
        Some(Reply::Question { prompt }) => (prompt.category.clone(), prompt.question.clone()),
        other => panic!("expected a question, got {other:?}"),
    }
}

#[tokio::test]
async fn asks_required_slots_and_publishes_optional_ones() {
    let caps = caps(false);
    let schema = registry()
        .get_schema("sensor", "reading", ChannelType::Trigger)
        .await
        .unwrap();
    let mut invocation = Invocation::new(schema, vec![]);
    let mut scope = Scope::new();
    let mut replies = Vec::new();
    let mut turn = Turn::new(&caps, &mut replies);

    let Resolution::Suspended { mut dialog, outcome } =
        resolve_invocation(&mut invocation, false, &[], &mut scope, &mut turn)
            .await
            .unwrap()
    else {
        panic!("expected questions");
    };
    assert!(scope.contains_key("b"));
    assert!(matches!(outcome, FlowOutcome::Ask(ref p) if p.question == "What is the value of argument a?"));

    let next = dialog.handle_raw("kitchen", &mut turn).await.unwrap();
    let FlowOutcome::Ask(prompt) = next else {
        panic!("expected the second question");
    };
    assert_eq!(prompt.question, "Above what temperature?");
    assert_eq!(prompt.category, ValueCategory::Measure("C".into()));

    let done = dialog
        .handle(Command::Answer(Value::measure(21.0, "C")), &mut turn)
        .await
        .unwrap();
    assert!(matches!(done, FlowOutcome::Complete(_)));
    assert_eq!(
        dialog.values(),
        &[
            Some(Value::String("kitchen".into())),
            None,
            Some(Value::measure(21.0, "C"))
        ]
    );
}

#[tokio::test]
async fn resolved_invocations_are_left_alone() {
    let caps = caps(false);
    let schema = ChannelSchema::new("builtin", "notify", ChannelType::Action, vec![]);
    let mut invocation = Invocation::new(schema, vec![]);
    let mut replies = Vec::new();
    let mut turn = Turn::new(&caps, &mut replies);

    for _ in 0..2 {
        let resolution = resolve_invocation(&mut invocation, true, &[], &mut Scope::new(), &mut turn)
            .await
            .unwrap();
        assert!(matches!(resolution, Resolution::Resolved));
        assert_eq!(invocation.resolved.as_ref().unwrap().values, Vec::<Option<Value>>::new());
    }
    drop(turn);
    assert!(replies.is_empty());
}

#[tokio::test]
async fn single_contact_is_resolved_before_asking() {
    let mut session = session(false);
    let send = Intent::new("email", "send")
        .with_arg(Comparison::is("to", Value::VarRef("$contact(alice)".into())));
    let replies = session.handle_command(Command::Action(send)).await.unwrap();
    let (category, question) = last_question(&replies);
    assert_eq!(category, ValueCategory::RawString);
    assert_eq!(question, "What is the value of argument body?");

    let replies = session.handle_raw("hi there").await.unwrap();
    match replies.as_slice() {
        [Reply::Program { code, .. }] => {
            assert!(code.contains("\"alice@example.com\"^^tt:email_address"), "{code}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn ambiguous_contact_is_disambiguated_first() {
    let mut session = session(true);
    let send = Intent::new("email", "send")
        .with_arg(Comparison::is("to", Value::VarRef("$contact(bob)".into())))
        .with_arg(Comparison::is("body", Value::String("hello".into())));
    let replies = session.handle_command(Command::Action(send)).await.unwrap();
    let (category, question) = last_question(&replies);
    assert_eq!(category, ValueCategory::MultipleChoice);
    assert!(question.contains("bob"));
    assert_eq!(session.current_flow(), "contact_search");

    let replies = session
        .handle_command(Command::Answer(Value::Number(0.0)))
        .await
        .unwrap();
    let (category, question) = last_question(&replies);
    assert_eq!(category, ValueCategory::YesNo);
    assert_eq!(
        question,
        "Ok, so you want me to send an email to Bob Smith and body is \"hello\". Is that right?"
    );
}

#[tokio::test]
async fn discovery_with_no_result_reverts() {
    let mut session = session(true);
    let replies = session
        .handle_command(Command::Discover {
            name: Some("thermostat".into()),
        })
        .await
        .unwrap();
    assert_eq!(
        replies,
        vec![
            Reply::text("Discovering..."),
            Reply::text("Can't find devices around.")
        ]
    );
    assert_eq!(session.depth(), 1);
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn discovery_with_two_results_offers_a_choice() {
    let mut session = session(true);
    let replies = session
        .handle_command(Command::Discover {
            name: Some("scale".into()),
        })
        .await
        .unwrap();
    let (category, _) = last_question(&replies);
    assert_eq!(category, ValueCategory::MultipleChoice);
    let choices = session.pending().unwrap().choice_titles();
    assert_eq!(choices, vec!["Kitchen Scale".to_string(), "Bathroom Scale".to_string()]);

    let replies = session
        .handle_command(Command::Answer(Value::Number(2.0)))
        .await
        .unwrap();
    assert_eq!(replies[0], Reply::text("Please click on one of the provided choices."));
    assert_eq!(session.pending().unwrap().choice_titles(), choices);

    let replies = session
        .handle_command(Command::Answer(Value::Number(1.0)))
        .await
        .unwrap();
    assert_eq!(replies, vec![Reply::text("Ok, let's set up Bathroom Scale.")]);
    assert_eq!(session.depth(), 1);
}

#[tokio::test]
async fn fully_specified_rule_generates_without_questions() {
    let mut session = session(false);
    let rule = Command::Rule {
        trigger: Some(
            Intent::new("builtin", "timer")
                .with_arg(Comparison::is("interval", Value::measure(5.0, "min"))),
        ),
        query: None,
        action: Some(
            Intent::new("builtin", "say")
                .with_arg(Comparison::is("message", Value::String("stretch".into()))),
        ),
    };
    let replies = session.handle_command(rule).await.unwrap();
    match replies.as_slice() {
        [Reply::Program { name, code }] => {
            assert_eq!(name, "RulecraftGeneratedTimerToSay");
            assert!(code.contains("@$timer(5min) => @builtin.say(\"stretch\");"), "{code}");
        }
        other => panic!("unexpected {other:?}"),
    }
}
