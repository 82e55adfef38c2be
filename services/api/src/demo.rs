use crate::infra::open_repository;
use clap::Args;
use ppdb::config::{AppConfig, DatabaseConfig};
use ppdb::enrollment::{
    ApplicationForm, ApplicationId, ApplicationRepository, ApplicationStatus, EnrollmentError,
    EnrollmentService, ListQuery, Requester, SqliteApplicationRepository,
};
use ppdb::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

const SEED_ADMIN: Requester = Requester::admin(1);

const STUDENTS: [&str; 8] = [
    "Andi Pratama",
    "Putri Lestari",
    "Rizky Hidayat",
    "Dewi Anggraini",
    "Fajar Nugroho",
    "Ayu Kartika",
    "Bima Saputra",
    "Nadia Rahmawati",
];

const SCHOOLS: [&str; 4] = [
    "SD Negeri 1 Jakarta",
    "SD Negeri 5 Bandung",
    "SD Muhammadiyah 2",
    "SD Kristen Harapan",
];

#[derive(Args, Debug)]
pub(crate) struct SeedArgs {
    /// SQLite database to seed (defaults to the configured path)
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
    /// Number of generated applicants, in addition to the three named samples
    #[arg(long, default_value_t = 10)]
    pub(crate) count: u32,
    /// First user id assigned to generated applicants
    #[arg(long, default_value_t = 100)]
    pub(crate) first_user_id: i64,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Student name used for the demo submission
    #[arg(long, default_value = "John Doe")]
    pub(crate) student_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedPlan {
    pub(crate) requester: Requester,
    pub(crate) form: ApplicationForm,
    pub(crate) status: ApplicationStatus,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SeedOutcome {
    pub(crate) created: u32,
    pub(crate) skipped: u32,
}

pub(crate) fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let SeedArgs {
        database,
        count,
        first_user_id,
    } = args;

    let config = match database {
        Some(path) => DatabaseConfig { path },
        None => AppConfig::load()?.database,
    };
    let repository = Arc::new(open_repository(&config)?);
    let service = EnrollmentService::new(repository.clone(), Default::default());

    let outcome = seed(&service, seed_plan(count, first_user_id))?;
    let counts = repository.status_counts()?;
    println!(
        "Seeded {} applications into {} ({} already present)",
        outcome.created,
        config.path.display(),
        outcome.skipped
    );
    println!(
        "Totals: {} applications | {} pending | {} accepted | {} rejected",
        counts.total, counts.pending, counts.accepted, counts.rejected
    );
    Ok(())
}

pub(crate) fn seed_plan(count: u32, first_user_id: i64) -> Vec<SeedPlan> {
    let mut plan: Vec<SeedPlan> = (0..count)
        .map(|index| {
            let slot = index as usize;
            let student = STUDENTS[slot % STUDENTS.len()];
            let status = ApplicationStatus::ALL[slot % ApplicationStatus::ALL.len()];
            SeedPlan {
                requester: Requester::applicant(first_user_id + i64::from(index)),
                form: sample_form(
                    student,
                    2010 + (index % 8) as i32,
                    SCHOOLS[slot % SCHOOLS.len()],
                ),
                status,
            }
        })
        .collect();

    let named_base = first_user_id + i64::from(count);
    let named = [
        ("John Doe Jr.", ApplicationStatus::Pending),
        ("Jane Smith", ApplicationStatus::Accepted),
        ("Bob Johnson", ApplicationStatus::Rejected),
    ];
    for (offset, (student, status)) in (0_i64..).zip(named) {
        plan.push(SeedPlan {
            requester: Requester::applicant(named_base + offset),
            form: sample_form(student, 2011, SCHOOLS[0]),
            status,
        });
    }
    plan
}

pub(crate) fn seed<R>(
    service: &EnrollmentService<R>,
    plan: Vec<SeedPlan>,
) -> Result<SeedOutcome, AppError>
where
    R: ApplicationRepository + 'static,
{
    let mut outcome = SeedOutcome::default();
    for entry in plan {
        let application = match service.create(&entry.requester, entry.form) {
            Ok(application) => application,
            Err(EnrollmentError::AlreadyExists(_)) => {
                outcome.skipped += 1;
                continue;
            }
            Err(err) => return Err(seed_failure(err)),
        };
        if entry.status != ApplicationStatus::Pending {
            service
                .set_status(application.id, &SEED_ADMIN, entry.status.as_str())
                .map_err(seed_failure)?;
        }
        outcome.created += 1;
    }
    Ok(outcome)
}

fn seed_failure(err: EnrollmentError) -> AppError {
    match err {
        EnrollmentError::Repository(source) => AppError::Storage(source),
        other => AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            other.to_string(),
        )),
    }
}

fn sample_form(student: &str, birth_year: i32, school: &str) -> ApplicationForm {
    let family_name = student.split_whitespace().last().unwrap_or(student);
    ApplicationForm {
        student_name: student.to_string(),
        birth_date: format!("{birth_year}-03-15"),
        full_address: format!("Jl. Merdeka No. {}, Jakarta", birth_year % 100),
        previous_school: school.to_string(),
        parent_name: format!("Bapak {family_name}"),
        parent_contact: format!("0812{birth_year}5678"),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(SqliteApplicationRepository::in_memory()?);
    let service = EnrollmentService::new(repository, Default::default());
    let applicant = Requester::applicant(42);
    let admin = Requester::admin(1);

    println!("Enrollment lifecycle demo (scratch in-memory database)");

    let mut form = sample_form(&args.student_name, 2010, SCHOOLS[0]);
    form.birth_date = "2010-01-01".to_string();
    let created = match service.create(&applicant, form.clone()) {
        Ok(application) => application,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    print_step("Applicant submitted", &service, created.id, &applicant);

    match service.create(&applicant, form.clone()) {
        Err(err) => println!("- Second submission refused: {err}"),
        Ok(_) => println!("- Second submission unexpectedly accepted"),
    }

    let mut edited = form;
    edited.full_address = "Jl. Sudirman No. 8, Bandung".to_string();
    match service.edit(created.id, &applicant, edited.clone()) {
        Ok(application) => println!(
            "- Pending edit saved: address now '{}'",
            application.fields.full_address
        ),
        Err(err) => println!("- Pending edit refused: {err}"),
    }

    if let Err(err) = service.set_status(created.id, &applicant, "accepted") {
        println!("- Applicant tried to accept their own application: {err}");
    }

    match service.set_status(created.id, &admin, "accepted") {
        Ok(_) => print_step("Admin accepted", &service, created.id, &applicant),
        Err(err) => println!("- Admin decision failed: {err}"),
    }

    match service.edit(created.id, &applicant, edited) {
        Err(err) => println!("- Edit after decision refused: {err}"),
        Ok(_) => println!("- Edit after decision unexpectedly saved"),
    }

    match service.list(&admin, ListQuery::default()) {
        Ok(page) => println!(
            "- Admin listing: {} application(s) across {} page(s)",
            page.total, page.last_page
        ),
        Err(err) => println!("- Admin listing unavailable: {err}"),
    }

    Ok(())
}

fn print_step<R>(
    step: &str,
    service: &EnrollmentService<R>,
    id: ApplicationId,
    viewer: &Requester,
) where
    R: ApplicationRepository + 'static,
{
    match service.get(id, viewer) {
        Ok(application) => println!(
            "- {step}: application {} for {} -> {} ({})",
            application.id,
            application.fields.student_name,
            application.status,
            application.status.label()
        ),
        Err(err) => println!("- {step}: lookup failed: {err}"),
    }
}
