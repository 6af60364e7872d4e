//! Thin command-issuing demonstration, in the same register as the
//! teacher's `chem-cli::main`: it is NOT an HTTP router (that surface is a
//! Non-goal, §1/§6), but it drives `CommandHandlers` through a fixed
//! reception → cashier → medical scenario and prints the `{error, message,
//! correlationId}` envelope §6 specifies for every command, exactly as an
//! HTTP adapter sitting on top of this same command surface would.

use serde::Serialize;
use uuid::Uuid;
use waitqueue_app::{correlation, CompositionRoot};
use waitqueue_domain::{AttentionOutcome, CheckInRequest, CommandError, CommandHandlers, Priority};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    error: Option<String>,
    message: String,
    correlation_id: Uuid,
}

fn report<T>(label: &str, correlation_id: Uuid, result: Result<T, CommandError>) {
    let envelope = match result {
        Ok(_) => Envelope { error: None, message: format!("{label} ok"), correlation_id },
        Err(e) => Envelope {
            error: Some(error_code(&e).to_string()),
            message: e.to_string(),
            correlation_id,
        },
    };
    println!("{}", serde_json::to_string(&envelope).expect("envelope serializes"));
}

fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Domain(_) => "DOMAIN_VIOLATION",
        CommandError::Core(_) => "CORE_ERROR",
    }
}

fn main() {
    env_logger::init();

    let root = CompositionRoot::from_env().expect("composition root: failed to connect to database");
    let handlers = CommandHandlers::new(&*root.event_store);
    let queue_id = "reception-demo";
    let actor = "command_service";

    let corr = correlation::new_root_correlation();
    report(
        "createQueue",
        corr,
        handlers.create_queue(queue_id, "Reception", 50, serde_json::json!({}), corr, actor),
    );

    let corr = correlation::new_root_correlation();
    report(
        "checkInPatient",
        corr,
        handlers.check_in_patient(
            queue_id,
            CheckInRequest {
                patient_id: "patient-1".to_string(),
                patient_name: "Ana Torres".to_string(),
                priority: Priority::Medium,
                consultation_type: "General".to_string(),
                notes: None,
            },
            corr,
            actor,
        ),
    );

    let corr = correlation::new_root_correlation();
    report("callNextAtCashier", corr, handlers.call_next_at_cashier(queue_id, corr, actor));

    let corr = correlation::new_root_correlation();
    report("validatePayment", corr, handlers.validate_payment(queue_id, "patient-1", corr, actor));

    let corr = correlation::new_root_correlation();
    report(
        "activateConsultingRoom",
        corr,
        handlers.activate_consulting_room(queue_id, "room-1", corr, actor),
    );

    let corr = correlation::new_root_correlation();
    report("claimNextPatient", corr, handlers.claim_next_patient(queue_id, "room-1", corr, actor));

    let corr = correlation::new_root_correlation();
    report("startConsultation", corr, handlers.start_consultation(queue_id, "patient-1", corr, actor));

    let corr = correlation::new_root_correlation();
    report(
        "finishConsultation",
        corr,
        handlers.finish_consultation(
            queue_id,
            "patient-1",
            AttentionOutcome { summary: "Routine checkup complete".to_string(), notes: None },
            corr,
            actor,
        ),
    );
}
