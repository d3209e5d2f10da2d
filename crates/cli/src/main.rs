use booking_client::BookingClient;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "booking")]
#[command(about = "Fibroid-care appointment booking CLI")]
struct Cli {
    /// Base URL of the booking proxy
    #[arg(long, env = "BOOKING_PROXY_URL", default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an access token from the proxy
    Token {
        /// Ignore any cached token
        #[arg(long)]
        force: bool,
    },
    /// List doctors for a specialty
    Doctors {
        /// Specialty code (defaults to the proxy's configured code)
        #[arg(long)]
        specialty: Option<String>,
    },
    /// List dates with open slots for a provider
    Dates {
        /// Provider NPI
        provider_id: String,
        /// Days to look ahead
        #[arg(long)]
        days: Option<u32>,
    },
    /// List slots for a provider at a location
    Slots {
        /// Provider NPI
        provider_id: String,
        /// Location id
        location_id: String,
        /// First date (YYYY-MM-DD)
        start_date: NaiveDate,
        /// Last date (YYYY-MM-DD)
        end_date: NaiveDate,
    },
    /// List visit reasons
    VisitReasons,
    /// Book an appointment
    Book {
        #[arg(long)]
        patient_id: String,
        /// Slot start (ISO 8601)
        #[arg(long)]
        start_time: String,
        /// Minutes
        #[arg(long)]
        duration: u32,
        #[arg(long)]
        provider_id: String,
        #[arg(long)]
        visit_reason_id: String,
        #[arg(long)]
        location_id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Search for an existing patient
    SearchPatients {
        first_name: String,
        last_name: String,
        /// Date of birth (YYYY-MM-DD or MM/DD/YYYY)
        date_of_birth: String,
        gender: String,
    },
    /// Create a patient
    CreatePatient {
        first_name: String,
        last_name: String,
        /// Date of birth (YYYY-MM-DD or MM/DD/YYYY)
        date_of_birth: String,
        email_address: String,
        phone_number: String,
        gender: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = BookingClient::new(&cli.url)?;

    match cli.command {
        Some(Commands::Token { force }) => match client.access_token(force).await {
            Ok(token) => println!("{}", token),
            Err(e) => eprintln!("Error fetching token: {}", e),
        },
        Some(Commands::Doctors { specialty }) => match client.doctors(specialty.as_deref()).await {
            Ok(doctors) if doctors.is_empty() => println!("No doctors found."),
            Ok(doctors) => {
                for doctor in doctors {
                    println!(
                        "ID: {}, Name: {}, Location: {}",
                        doctor.provider_id,
                        doctor.display_name,
                        doctor.location_id.unwrap_or_default()
                    );
                }
            }
            Err(e) => eprintln!("Error listing doctors: {}", e),
        },
        Some(Commands::Dates { provider_id, days }) => {
            match client.available_dates(&provider_id, days).await {
                Ok(dates) if dates.is_empty() => println!("No available dates."),
                Ok(dates) => {
                    for date in dates {
                        let times: Vec<&str> =
                            date.slots.iter().map(|s| s.display_time.as_str()).collect();
                        println!("{} ({} slots): {}", date.date, date.slots_count, times.join(", "));
                    }
                }
                Err(e) => eprintln!("Error listing available dates: {}", e),
            }
        }
        Some(Commands::Slots {
            provider_id,
            location_id,
            start_date,
            end_date,
        }) => match client
            .slots(&provider_id, &location_id, start_date, end_date)
            .await
        {
            Ok(slots) if slots.is_empty() => println!("No slots in range."),
            Ok(slots) => {
                for slot in slots {
                    println!(
                        "{} {} - {} available: {}",
                        slot.display_time, slot.start_time, slot.end_time, slot.available
                    );
                }
            }
            Err(e) => eprintln!("Error listing slots: {}", e),
        },
        Some(Commands::VisitReasons) => match client.visit_reasons().await {
            Ok(reasons) => {
                for reason in reasons {
                    println!(
                        "ID: {}, Name: {}, Code: {}",
                        reason.id,
                        reason.name,
                        reason.code.unwrap_or_default()
                    );
                }
            }
            Err(e) => eprintln!("Error listing visit reasons: {}", e),
        },
        Some(Commands::Book {
            patient_id,
            start_time,
            duration,
            provider_id,
            visit_reason_id,
            location_id,
            notes,
        }) => {
            let booking = json!({
                "patient_id": patient_id,
                "start_time": start_time,
                "duration": duration,
                "provider_id": provider_id,
                "visit_reason_id": visit_reason_id,
                "location_id": location_id,
                "notes": notes.unwrap_or_default(),
            });
            match client.book_appointment(&booking).await {
                Ok(confirmation) => println!(
                    "Booked appointment {} ({})",
                    confirmation.appointment_id.unwrap_or_else(|| "<no id>".into()),
                    confirmation.status
                ),
                Err(e) => eprintln!("Error booking appointment: {}", e),
            }
        }
        Some(Commands::SearchPatients {
            first_name,
            last_name,
            date_of_birth,
            gender,
        }) => {
            let criteria = json!({
                "first_name": first_name,
                "last_name": last_name,
                "date_of_birth": date_of_birth,
                "gender": gender,
            });
            match client.search_patients(&criteria).await {
                Ok(patients) if patients.is_empty() => println!("No patients found."),
                Ok(patients) => {
                    for patient in patients {
                        println!(
                            "ID: {}, Name: {} {}, DOB: {}",
                            patient.patient_id,
                            patient.first_name,
                            patient.last_name,
                            patient.date_of_birth
                        );
                    }
                }
                Err(e) => eprintln!("Error searching patients: {}", e),
            }
        }
        Some(Commands::CreatePatient {
            first_name,
            last_name,
            date_of_birth,
            email_address,
            phone_number,
            gender,
        }) => {
            let patient = json!({
                "first_name": first_name,
                "last_name": last_name,
                "date_of_birth": date_of_birth,
                "email_address": email_address,
                "phone_number": phone_number,
                "gender": gender,
            });
            match client.create_patient(&patient).await {
                Ok(patient_id) => println!("Created patient with ID: {}", patient_id),
                Err(e) => eprintln!("Error creating patient: {}", e),
            }
        }
        None => {
            println!("Use 'booking --help' for commands");
        }
    }

    Ok(())
}
