use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use dispensary_core::models::{
    Medication, MedicationPatch, NewPrescription, Order, OrderDraft, OrderStatus, Patient,
    Pharmacy, PreparedItems, PrescribedItem, Prescription,
};
use dispensary_core::{config_from_env_values, OrderEngine};
use dispensary_store::{initialise_layout, reset_layout, FileStore, Singleton, SingletonKey};
use dispensary_types::{
    Caller, MedicationId, NonEmptyText, OrderId, PharmacyId, PrescriptionId, Role, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dispensary")]
#[command(about = "Prescription, pharmacy order and inventory CLI")]
struct Cli {
    /// Directory holding the data store
    #[arg(long, global = true, env = "DISPENSARY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the empty collections if this data directory was never used
    Init,
    /// Wipe every collection, the session and the initialisation flag
    Reset,
    /// Act as the given user from now on
    Login {
        user_id: String,
        /// prescriber, patient or pharmacist
        role: Role,
    },
    /// Forget the current session
    Logout,
    /// Show the current session
    Whoami,

    /// List the catalog with stock levels
    Medications {
        /// Only medications whose name contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a medication to the catalog
    AddMedication {
        name: String,
        dosage: String,
        form: String,
        /// Medication id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        manufacturer: Option<String>,
        #[arg(long, default_value_t = 0)]
        stock: u32,
    },
    /// Update fields of a catalog medication
    UpdateMedication {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dosage: Option<String>,
        #[arg(long)]
        form: Option<String>,
        #[arg(long)]
        manufacturer: Option<String>,
        /// Set the stock quantity directly
        #[arg(long)]
        stock: Option<u32>,
    },
    /// Delete a medication no prescription or order still depends on
    DeleteMedication { id: String },
    /// Add (or with a negative delta, remove) stock; never goes below zero
    AdjustStock {
        id: String,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Count medications per stock level
    StockSummary,

    /// Register a patient (prescriber)
    AddPatient {
        /// Patient user id
        id: String,
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List registered patients
    Patients,

    /// Issue a prescription (prescriber)
    IssuePrescription {
        /// Patient user id
        patient_id: String,
        /// Line items as MEDICATION:DAILY_QUANTITY:DURATION_DAYS
        #[arg(required = true, value_parser = parse_item)]
        items: Vec<PrescribedItem>,
        /// Prescription id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Expiration date (YYYY-MM-DD); defaults to the configured validity
        #[arg(long, value_parser = parse_date)]
        expires: Option<DateTime<Utc>>,
    },
    /// List prescriptions (your own unless --patient is given)
    Prescriptions {
        #[arg(long)]
        patient: Option<String>,
        /// Only prescriptions that can still be ordered
        #[arg(long)]
        orderable: bool,
    },

    /// Register a pharmacy
    AddPharmacy {
        id: String,
        name: String,
        address: String,
        #[arg(long)]
        phone: Option<String>,
        /// Linked pharmacist user id (repeatable)
        #[arg(long = "pharmacist")]
        pharmacists: Vec<String>,
    },
    /// List pharmacies
    Pharmacies,

    /// Order a prescription at a pharmacy (patient)
    CreateOrder {
        prescription_id: String,
        pharmacy_id: String,
        /// Order id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark medications of an order as prepared (pharmacist)
    Prepare {
        order_id: String,
        #[arg(required = true)]
        medication_ids: Vec<String>,
        /// Mark as not prepared instead
        #[arg(long)]
        undo: bool,
    },
    /// Move an order to a new status (pharmacist)
    SetStatus {
        order_id: String,
        status: OrderStatus,
    },
    /// List orders (your own, or your pharmacies' for pharmacists)
    Orders {
        #[arg(long)]
        status: Option<OrderStatus>,
        #[arg(long)]
        pharmacy: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dispensary_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'dispensary --help' for commands");
        return Ok(());
    };

    let cfg = Arc::new(config_from_env_values(
        cli.data_dir.map(|dir| dir.display().to_string()),
        std::env::var("DISPENSARY_LOW_STOCK_BELOW").ok(),
        std::env::var("DISPENSARY_MEDIUM_STOCK_BELOW").ok(),
        std::env::var("DISPENSARY_PRESCRIPTION_VALIDITY_DAYS").ok(),
    )?);
    let store = Arc::new(FileStore::create(cfg.data_dir()).with_context(|| {
        format!("cannot open data directory {}", cfg.data_dir().display())
    })?);
    let session: Singleton<FileStore, Caller> =
        Singleton::new(Arc::clone(&store), SingletonKey::Session);

    match command {
        Commands::Init => {
            if initialise_layout(store.as_ref()).await? {
                println!("Initialised {}", cfg.data_dir().display());
            } else {
                println!("{} is already initialised", cfg.data_dir().display());
            }
            return Ok(());
        }
        Commands::Reset => {
            reset_layout(store.as_ref()).await?;
            println!("Reset {}", cfg.data_dir().display());
            return Ok(());
        }
        Commands::Login { user_id, role } => {
            let caller = Caller::new(user_id, role);
            session.set(&caller).await?;
            println!("Logged in as {} ({})", caller.id, caller.role);
            return Ok(());
        }
        Commands::Logout => {
            session.clear().await?;
            println!("Logged out");
            return Ok(());
        }
        Commands::Whoami => {
            match session.get().await? {
                Some(caller) => println!("{} ({})", caller.id, caller.role),
                None => println!("Not logged in"),
            }
            return Ok(());
        }
        _ => {}
    }

    initialise_layout(store.as_ref()).await?;
    let engine = OrderEngine::new(store, Arc::clone(&cfg));
    let caller = session
        .get()
        .await?
        .ok_or_else(|| anyhow!("not logged in; run 'dispensary login <user-id> <role>'"))?;

    run(&engine, &caller, command).await
}

async fn run(
    engine: &OrderEngine<FileStore>,
    caller: &Caller,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Medications { search } => {
            let medications = match search {
                Some(query) => engine.search_medications(&query).await?,
                None => engine.list_medications().await?,
            };
            if medications.is_empty() {
                println!("No medications found.");
            }
            for medication in &medications {
                print_medication(engine, medication);
            }
        }
        Commands::AddMedication {
            name,
            dosage,
            form,
            id,
            manufacturer,
            stock,
        } => {
            let medication = Medication {
                id: id.map(MedicationId::from).unwrap_or_else(MedicationId::generate),
                name: NonEmptyText::new(name)?,
                dosage: NonEmptyText::new(dosage)?,
                form: NonEmptyText::new(form)?,
                manufacturer,
                stock_quantity: stock,
            };
            let id = medication.id.clone();
            engine.add_medication(caller, medication).await?;
            println!("Added medication {}", id);
        }
        Commands::UpdateMedication {
            id,
            name,
            dosage,
            form,
            manufacturer,
            stock,
        } => {
            let patch = MedicationPatch {
                name: name.map(NonEmptyText::new).transpose()?,
                dosage: dosage.map(NonEmptyText::new).transpose()?,
                form: form.map(NonEmptyText::new).transpose()?,
                manufacturer,
                stock_quantity: stock,
            };
            engine
                .update_medication(caller, &MedicationId::from(id.as_str()), patch)
                .await?;
            println!("Updated medication {}", id);
        }
        Commands::DeleteMedication { id } => {
            engine
                .delete_medication(caller, &MedicationId::from(id.as_str()))
                .await?;
            println!("Deleted medication {}", id);
        }
        Commands::AdjustStock { id, delta } => {
            let id = MedicationId::from(id);
            engine.adjust_stock(caller, &id, delta).await?;
            let medication = engine.get_medication(&id).await?;
            println!("Stock of {} is now {}", id, medication.stock_quantity);
        }
        Commands::StockSummary => {
            let summary = engine.stock_summary().await?;
            println!(
                "low: {}, medium: {}, good: {}",
                summary.low, summary.medium, summary.good
            );
        }
        Commands::AddPatient {
            id,
            name,
            email,
            phone,
        } => {
            let patient = Patient {
                id: UserId::from(id),
                name: NonEmptyText::new(name)?,
                email,
                phone,
            };
            let id = patient.id.clone();
            engine.register_patient(caller, patient).await?;
            println!("Registered patient {}", id);
        }
        Commands::Patients => {
            let patients = engine.list_patients().await?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                println!("ID: {}, Name: {}", patient.id, patient.name);
            }
        }
        Commands::IssuePrescription {
            patient_id,
            items,
            id,
            expires,
        } => {
            let new = NewPrescription {
                id: id
                    .map(PrescriptionId::from)
                    .unwrap_or_else(PrescriptionId::generate),
                patient_id: UserId::from(patient_id),
                items,
                expiration_date: expires,
            };
            let prescription = engine.issue_prescription(caller, new).await?;
            println!(
                "Issued prescription {} (expires {})",
                prescription.id,
                prescription.expiration_date.format("%Y-%m-%d")
            );
        }
        Commands::Prescriptions { patient, orderable } => {
            let prescriptions = match (patient, caller.role) {
                (Some(patient), _) => {
                    patient_prescriptions(engine, &UserId::from(patient), orderable).await?
                }
                (None, Role::Patient) => {
                    patient_prescriptions(engine, &caller.id, orderable).await?
                }
                (None, Role::Prescriber) => {
                    engine.list_prescriptions_for_prescriber(&caller.id).await?
                }
                (None, Role::Pharmacist) => {
                    return Err(anyhow!("pharmacists must pass --patient"));
                }
            };
            if prescriptions.is_empty() {
                println!("No prescriptions found.");
            }
            let now = Utc::now();
            for prescription in &prescriptions {
                print_prescription(prescription, now);
            }
        }
        Commands::AddPharmacy {
            id,
            name,
            address,
            phone,
            pharmacists,
        } => {
            let pharmacy = Pharmacy {
                id: PharmacyId::from(id),
                name: NonEmptyText::new(name)?,
                address: NonEmptyText::new(address)?,
                phone,
                pharmacist_ids: pharmacists.into_iter().map(UserId::from).collect(),
            };
            let id = pharmacy.id.clone();
            engine.register_pharmacy(caller, pharmacy).await?;
            println!("Registered pharmacy {}", id);
        }
        Commands::Pharmacies => {
            let pharmacies = engine.list_pharmacies().await?;
            if pharmacies.is_empty() {
                println!("No pharmacies found.");
            }
            for pharmacy in pharmacies {
                println!(
                    "ID: {}, Name: {}, Address: {}",
                    pharmacy.id, pharmacy.name, pharmacy.address
                );
            }
        }
        Commands::CreateOrder {
            prescription_id,
            pharmacy_id,
            id,
            address,
            notes,
        } => {
            let draft = OrderDraft {
                id: id.map(OrderId::from).unwrap_or_else(OrderId::generate),
                prescription_id: PrescriptionId::from(prescription_id),
                pharmacy_id: PharmacyId::from(pharmacy_id),
                delivery_address: address,
                notes,
            };
            let id = draft.id.clone();
            engine.create_order(caller, draft).await?;
            println!("Created order {}", id);
        }
        Commands::Prepare {
            order_id,
            medication_ids,
            undo,
        } => {
            let items: PreparedItems = medication_ids
                .into_iter()
                .map(|id| (MedicationId::from(id), !undo))
                .collect();
            let order = engine
                .set_prepared_items(caller, &OrderId::from(order_id), items)
                .await?;
            print_order(&order);
        }
        Commands::SetStatus { order_id, status } => {
            let order_id = OrderId::from(order_id);
            engine
                .update_order_status(caller, &order_id, status, None)
                .await?;
            println!("Order {} is now {}", order_id, status);
        }
        Commands::Orders { status, pharmacy } => {
            let mut orders = match (pharmacy, caller.role) {
                (Some(pharmacy), _) => {
                    engine
                        .list_orders_for_pharmacy(&PharmacyId::from(pharmacy))
                        .await?
                }
                (None, Role::Patient) => engine.list_orders_for_patient(&caller.id).await?,
                (None, Role::Pharmacist) => engine.list_orders_for_pharmacist(&caller.id).await?,
                (None, Role::Prescriber) => engine.list_orders().await?,
            };
            if let Some(status) = status {
                orders.retain(|order| order.status == status);
            }
            if orders.is_empty() {
                println!("No orders found.");
            }
            for order in &orders {
                print_order(order);
            }
        }
        // Store and session commands are handled in main.
        Commands::Init
        | Commands::Reset
        | Commands::Login { .. }
        | Commands::Logout
        | Commands::Whoami => {}
    }

    Ok(())
}

async fn patient_prescriptions(
    engine: &OrderEngine<FileStore>,
    patient_id: &UserId,
    orderable: bool,
) -> anyhow::Result<Vec<Prescription>> {
    let prescriptions = if orderable {
        engine.list_orderable_prescriptions(patient_id).await?
    } else {
        engine.list_prescriptions_for_patient(patient_id).await?
    };
    Ok(prescriptions)
}

fn print_medication(engine: &OrderEngine<FileStore>, medication: &Medication) {
    println!(
        "ID: {}, Name: {} {} ({}), Stock: {} [{:?}]",
        medication.id,
        medication.name,
        medication.dosage,
        medication.form,
        medication.stock_quantity,
        engine.stock_level(medication)
    );
}

fn print_prescription(prescription: &Prescription, now: DateTime<Utc>) {
    println!(
        "ID: {}, Patient: {}, Prescriber: {}, Expires: {}, Status: {:?}",
        prescription.id,
        prescription.patient_id,
        prescription.prescriber_id,
        prescription.expiration_date.format("%Y-%m-%d"),
        prescription.status_at(now)
    );
    for item in &prescription.items {
        println!(
            "    {} × {}/day for {} days ({} units)",
            item.medication_id,
            item.daily_quantity,
            item.duration_days,
            item.needed_quantity()
        );
    }
}

fn print_order(order: &Order) {
    let prepared = order
        .prepared_items
        .iter()
        .filter(|(_, done)| **done)
        .map(|(id, _)| id.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "ID: {}, Prescription: {}, Pharmacy: {}, Status: {}, Created: {}, Prepared: [{}]",
        order.id,
        order.prescription_id,
        order.pharmacy_id,
        order.status,
        order.created_at.format("%Y-%m-%d %H:%M"),
        prepared
    );
}

/// Parses `MEDICATION:DAILY_QUANTITY:DURATION_DAYS`.
fn parse_item(s: &str) -> Result<PrescribedItem, String> {
    let mut parts = s.split(':');
    let (Some(medication), Some(daily), Some(days), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!(
            "expected MEDICATION:DAILY_QUANTITY:DURATION_DAYS, got '{s}'"
        ));
    };
    let daily_quantity = daily
        .trim()
        .parse()
        .map_err(|_| format!("invalid daily quantity '{daily}'"))?;
    let duration_days = days
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration '{days}'"))?;
    Ok(PrescribedItem {
        medication_id: MedicationId::from(medication.trim()),
        daily_quantity,
        duration_days,
    })
}

/// Parses `YYYY-MM-DD` as midnight UTC.
fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_line_items() {
        let item = parse_item("m001:2:5").unwrap();
        assert_eq!(item.medication_id.as_str(), "m001");
        assert_eq!(item.needed_quantity(), 10);

        assert!(parse_item("m001:2").is_err());
        assert!(parse_item("m001:two:5").is_err());
        assert!(parse_item("m001:2:5:1").is_err());
    }

    #[test]
    fn parses_dates() {
        let date = parse_date("2026-12-31").unwrap();
        assert_eq!(date.to_rfc3339(), "2026-12-31T00:00:00+00:00");
        assert!(parse_date("31/12/2026").is_err());
    }

    #[test]
    fn negative_stock_delta_is_accepted() {
        let cli = Cli::try_parse_from(["dispensary", "adjust-stock", "m001", "-5"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::AdjustStock { delta: -5, .. })
        ));
    }

    #[test]
    fn add_patient_takes_optional_contact() {
        let cli = Cli::try_parse_from([
            "dispensary",
            "add-patient",
            "u222",
            "Marie Dupont",
            "--email",
            "marie@example.org",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::AddPatient { ref email, phone: None, .. })
                if email.as_deref() == Some("marie@example.org")
        ));
    }
}
