use hyphen_toggle::{ClientConfig, EvaluationContext, User};

pub fn main() {
    env_logger::init();

    let public_key = std::env::var("HYPHEN_PUBLIC_KEY").unwrap();
    let client = ClientConfig::from_public_key(public_key)
        .application("demo")
        .environment("development")
        .to_client()
        .unwrap();

    let context = EvaluationContext::builder()
        .user(User::with_id("test-user"))
        .custom_attribute("plan", "pro")
        .build();

    // Get evaluation for test-user. Usage is reported in the background.
    let enabled = client
        .get_evaluation("a-boolean-toggle", &context)
        .ok()
        .and_then(|evaluation| evaluation.value.as_boolean())
        // default value
        .unwrap_or(false);

    println!("Evaluation: {:?}", enabled);

    // Wait for usage reports to be delivered before exiting.
    client.shutdown().unwrap();
}
