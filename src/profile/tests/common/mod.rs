//! Shared helpers for integration tests

use comarmor_profile::{Element, ObjectKind, Permission, Profile, ProfileTree, Rule};
use std::sync::Once;

static INIT: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`
#[allow(dead_code)]
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A small talker/listener policy
#[allow(dead_code)]
pub fn talker_listener_tree() -> ProfileTree {
    ProfileTree::new(vec![
        Profile::new("/talker")
            .with_attachment("/talker")
            .with_rule(
                Rule::allow(ObjectKind::RosTopic)
                    .with_attachment("/chatter")
                    .with_permission(Permission::RosPublish),
            )
            .with_rule(
                Rule::allow(ObjectKind::RosTopic)
                    .with_attachment("/rosout")
                    .with_permission(Permission::RosPublish),
            ),
        Profile::new("/listener")
            .with_attachment("/listener")
            .with_rule(
                Rule::allow(ObjectKind::RosTopic)
                    .with_attachment("/chatter")
                    .with_permission(Permission::RosSubscribe),
            ),
    ])
    .with_origin("talker_listener.xml")
}

/// The same policy as a generic tree, as an external loader would hand it over
#[allow(dead_code)]
pub fn talker_listener_element() -> Element {
    let rule = |object: &str, verb: &str| {
        Element::new("ros_topic")
            .with_attribute("qualifier", "ALLOW")
            .with_child(
                Element::new("attachments")
                    .with_child(Element::new("attachment").with_text(object)),
            )
            .with_child(Element::new("permissions").with_child(Element::new(verb)))
    };

    Element::new("profiles")
        .with_child(
            Element::new("profile")
                .with_attribute("name", "/talker")
                .with_child(Element::new("attachment").with_text("/talker"))
                .with_child(rule("/chatter", "ros_publish"))
                .with_child(rule("/rosout", "ros_publish")),
        )
        .with_child(
            Element::new("profile")
                .with_attribute("name", "/listener")
                .with_child(Element::new("attachment").with_text("/listener"))
                .with_child(rule("/chatter", "ros_subscribe")),
        )
}
