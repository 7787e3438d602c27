//! Console demo: a line-oriented presentation adapter driving the
//! coordinator against the real Firebase gateway.

use std::io::Write;
use std::sync::Arc;

use authboard::firebase::{FirebaseConfig, FirebaseGateway};
use authboard::{AuthCoordinator, FederatedCredential, FollowupAction};

const HELP: &str = "\
commands:
  email <v> | password <v>                   sign-in fields
  remail <v> | rpassword <v> | rconfirm <v>  sign-up fields
  signin | signup                            switch form section
  login | register | reset <email> | google <id-token>
  state | help | quit";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = FirebaseConfig::from_env().expect("FIREBASE_API_KEY required");
    let gateway = FirebaseGateway::new(config).expect("http client init failed");
    let mut coordinator = AuthCoordinator::new(Arc::new(gateway));

    tracing::info!("authboard console demo started");
    println!("{HELP}");

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush().expect("stdout flush failed");
        line.clear();
        if stdin.read_line(&mut line).expect("stdin read failed") == 0 {
            break;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("");
        let argument = parts.next().unwrap_or("");

        let submitted = match command {
            "email" => {
                coordinator.set_email(argument);
                false
            }
            "password" => {
                coordinator.set_password(argument);
                false
            }
            "remail" => {
                coordinator.set_register_email(argument);
                false
            }
            "rpassword" => {
                coordinator.set_register_password(argument);
                false
            }
            "rconfirm" => {
                coordinator.set_register_confirm_password(argument);
                false
            }
            "signin" => {
                coordinator.switch_to_sign_in();
                false
            }
            "signup" => {
                coordinator.switch_to_sign_up();
                false
            }
            "login" => coordinator.submit_login(),
            "register" => coordinator.submit_register(),
            "reset" => coordinator.submit_password_recovery(argument),
            "google" => coordinator.submit_google_login(FederatedCredential::google(argument)),
            "state" => {
                println!("{:?}", coordinator.snapshot());
                false
            }
            "help" => {
                println!("{HELP}");
                false
            }
            "quit" => break,
            "" => false,
            other => {
                println!("unknown command: {other}");
                false
            }
        };

        if !submitted {
            if matches!(command, "login" | "register" | "reset" | "google") {
                println!("not submitted: form incomplete or a request is already in flight");
            }
            continue;
        }

        match coordinator.resolve_next().await {
            Some(descriptor) => {
                println!("{}: {}", descriptor.title, descriptor.message);
                if descriptor.followup == FollowupAction::Proceed {
                    println!("(proceeding to the main screen)");
                    break;
                }
            }
            None => break,
        }
    }

    if coordinator.proceed_to_next_screen() {
        coordinator.sign_out().await.expect("sign-out failed");
        tracing::info!("signed out, demo finished");
    }
}
