// booking_engine/src/seed.rs
//! Demo providers installed on a cold start so the marketplace is never
//! empty. All three ship verified, with complete paperwork and a weekly
//! calendar already declared.

use std::collections::BTreeSet;

use chrono::{NaiveTime, Utc};

use models::{
    DayOfWeek, DocumentKind, DocumentSet, DocumentUpload, Money, Provider, ProviderId,
    ProviderProfile, ServiceMode, VerificationStatus, WeeklySchedule,
};

fn slot(hour: u32, minute: u32) -> NaiveTime {
    // Static fixture times, always in range.
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn weekdays(times: &[NaiveTime]) -> WeeklySchedule {
    WeeklySchedule::new()
        .with(DayOfWeek::Monday, times)
        .with(DayOfWeek::Tuesday, times)
        .with(DayOfWeek::Wednesday, times)
        .with(DayOfWeek::Thursday, times)
        .with(DayOfWeek::Friday, times)
}

fn paperwork(slug: &str) -> DocumentSet {
    let mut documents = DocumentSet::new();
    for kind in DocumentKind::MANDATORY {
        let file = match kind {
            DocumentKind::AcademicTitle => "title.pdf",
            DocumentKind::Identity => "identity.pdf",
            DocumentKind::HealthCertificate => "health-certificate.pdf",
            DocumentKind::SpecializationCertificate => "specialization.pdf",
        };
        documents.attach(
            kind,
            DocumentUpload::uploaded(
                &format!("stored://providers/{}/{}", slug, file),
                file,
                "application/pdf",
                96 * 1024,
            ),
        );
    }
    documents
}

fn verified(slug: &str, profile: ProviderProfile, schedule: WeeklySchedule) -> Provider {
    let id = ProviderId::new(slug.to_string()).unwrap();
    let mut provider = Provider::from_profile(id, profile, paperwork(slug), Utc::now());
    provider.weekly_schedule = schedule;
    provider.verification_status = VerificationStatus::Verified;
    provider
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// The three demo providers present on first boot.
pub fn demo_providers() -> Vec<Provider> {
    vec![
        verified(
            "md-cortes",
            ProviderProfile {
                name: "Dra. Aitana Cortés".to_string(),
                specialty: "Interventional cardiology".to_string(),
                academic_title: "MD".to_string(),
                workplace: "Clínica Horizonte".to_string(),
                price: Money::from_major(65),
                rating: 4.9,
                tags: tags(&["hypertension", "echocardiography", "telemedicine"]),
                service_modes: BTreeSet::from([ServiceMode::InPerson, ServiceMode::HomeVisit]),
                bio: Some(
                    "Cardiologist focused on early detection and cardiac rehabilitation."
                        .to_string(),
                ),
                email: Some("a.cortes@clinicahorizonte.example".to_string()),
                phone: Some("+34 600 111 222".to_string()),
            },
            weekdays(&[slot(9, 0), slot(9, 45), slot(11, 30), slot(16, 15)]),
        ),
        verified(
            "md-jurado",
            ProviderProfile {
                name: "Dr. Thiago Jurado".to_string(),
                specialty: "Clinical and aesthetic dermatology".to_string(),
                academic_title: "MD".to_string(),
                workplace: "DermHub Eclipse".to_string(),
                price: Money::from_major(42),
                rating: 4.7,
                tags: tags(&["acne", "laser therapy", "pediatric dermatology"]),
                service_modes: BTreeSet::from([ServiceMode::InPerson, ServiceMode::Virtual]),
                bio: Some("Dermatologist combining clinical practice with laser work.".to_string()),
                email: Some("t.jurado@dermhub.example".to_string()),
                phone: Some("+34 600 333 444".to_string()),
            },
            weekdays(&[slot(10, 0), slot(12, 30), slot(15, 0), slot(18, 40)]),
        ),
        verified(
            "md-salvatierra",
            ProviderProfile {
                name: "Lic. Zoe Salvatierra".to_string(),
                specialty: "Intensive care nursing".to_string(),
                academic_title: "RN".to_string(),
                workplace: "Red NeonCare".to_string(),
                price: Money::from_major(30),
                rating: 4.8,
                tags: tags(&["home care", "post-surgical follow-up"]),
                service_modes: BTreeSet::from([ServiceMode::HomeVisit]),
                bio: Some("Critical care nurse doing scheduled home visits.".to_string()),
                email: Some("z.salvatierra@neoncare.example".to_string()),
                phone: Some("+34 600 555 666".to_string()),
            },
            weekdays(&[slot(8, 15), slot(13, 30), slot(20, 15)])
                .with(DayOfWeek::Saturday, &[slot(8, 15), slot(13, 30)]),
        ),
    ]
}
