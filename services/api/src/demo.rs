use crate::infra::{build_service, default_rubric, seed_organization, MemoryQualificationService};
use clap::Args;
use qualify::cache::CacheStatus;
use qualify::config::ScoringConfig;
use qualify::responses::SIMPLE_FORMAT_SEPARATOR;
use qualify::error::AppError;
use qualify::{ActorId, AssessmentResult, EntityId, OrganizationId, PillarId, QuestionId, Response};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Organization used for the walkthrough
    #[arg(long, default_value = "demo-org")]
    pub(crate) organization: String,
    /// Opportunity being qualified
    #[arg(long, default_value = "opp-1001")]
    pub(crate) entity: String,
    /// Skip the rubric re-versioning portion of the demo
    #[arg(long)]
    pub(crate) skip_versioning: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        organization,
        entity,
        skip_versioning,
    } = args;

    let service = build_service(&ScoringConfig::default());
    let organization_id = OrganizationId::new(organization);
    let entity_id = EntityId::new(entity);
    let actor = ActorId::new("demo-admin");

    println!("Qualification scoring demo");
    let version = seed_organization(&service, &organization_id, &actor)?;
    println!("- Seeded default MEDDPICC rubric as version {version} for {organization_id}");

    let responses = sample_responses();
    let first = service.get_score(&entity_id, &responses, &organization_id)?;
    render_assessment(&first.assessment, first.status);

    let second = service.get_score(&entity_id, &responses, &organization_id)?;
    println!(
        "\nRepeat request: {} (calculated at {})",
        status_label(second.status),
        second.assessment.calculated_at.to_rfc3339()
    );

    render_simple_round_trip(&service, &organization_id, &responses)?;

    if skip_versioning {
        return Ok(());
    }

    let mut revised = default_rubric();
    for pillar in &mut revised.pillars {
        match pillar.id.as_str() {
            "champion" => pillar.weight = 20.0,
            "competition" => pillar.weight = 5.0,
            _ => {}
        }
    }
    let saved = service.store().save_configuration(
        &organization_id,
        revised,
        &actor,
        Some("weight champion over competition".to_string()),
    )?;
    service
        .store()
        .activate_configuration(&organization_id, saved.version, &actor)?;
    println!("\nActivated rubric version {}", saved.version);

    let rescored = service.get_score(&entity_id, &responses, &organization_id)?;
    render_assessment(&rescored.assessment, rescored.status);

    let restored = service.store().restore_configuration(
        &organization_id,
        version,
        &actor,
        Some("compare against launch weights".to_string()),
    )?;
    println!(
        "\nRestored version {version} as draft version {}",
        restored.version
    );

    println!("\nConfiguration history (newest first)");
    for entry in service.store().get_history(&organization_id, None)? {
        let previous = entry
            .previous_version
            .map(|version| format!("v{version}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "- {} {} -> v{} by {}: {}",
            entry.change_type.label(),
            previous,
            entry.new_version,
            entry.actor_id,
            entry.diff.summary()
        );
    }

    Ok(())
}

fn render_assessment(assessment: &AssessmentResult, status: CacheStatus) {
    println!(
        "\n{} scored {:.2} ({}) against rubric v{} [{}]",
        assessment.entity_id,
        assessment.total_score,
        assessment.risk_label(),
        assessment.config_version_used,
        status_label(status)
    );
    for pillar in &assessment.pillar_breakdown {
        println!(
            "  - {}: {}/{} points | {}/{} answered | {:.2} of {}",
            pillar.pillar_name,
            pillar.raw_points,
            pillar.max_points,
            pillar.answered_questions,
            pillar.total_questions,
            pillar.contribution,
            pillar.weight
        );
    }
}

fn render_simple_round_trip(
    service: &MemoryQualificationService,
    organization_id: &OrganizationId,
    responses: &[Response],
) -> Result<(), AppError> {
    let blobs = service.to_simple_format(organization_id, responses, None)?;

    println!("\nSimple format");
    for (pillar_id, text) in &blobs {
        if text.is_empty() {
            continue;
        }
        let parse = service
            .to_comprehensive_format(organization_id, pillar_id, text, None)?;
        println!(
            "- {pillar_id}: {} line(s) -> {} answer(s) recovered",
            text.split(SIMPLE_FORMAT_SEPARATOR).count(),
            parse.answers.len()
        );
    }

    let legacy = "Spoke with the VP of Sales about renewal risk";
    let parse = service
        .to_comprehensive_format(organization_id, &PillarId::new("champion"), legacy, None)?;
    for warning in &parse.warnings {
        println!("- legacy text flagged for review: {warning}");
    }
    Ok(())
}

fn sample_responses() -> Vec<Response> {
    [
        ("metrics", "m1", "Cut onboarding time from 6 weeks to 2", 10),
        ("metrics", "m2", "Time-to-first-value dashboard reviewed monthly", 4),
        ("economic_buyer", "eb1", "CFO owns the operations budget", 8),
        ("identify_pain", "ip1", "Manual reconciliation costs 3 FTE", 10),
        ("champion", "ch1", "Director of RevOps", 7),
        ("decision_process", "dp2", "", 0),
    ]
    .into_iter()
    .map(|(pillar, question, answer, points)| Response {
        pillar_id: PillarId::new(pillar),
        question_id: QuestionId::new(question),
        answer: answer.to_string(),
        points,
    })
    .collect()
}

fn status_label(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::Hit => "cache hit",
        CacheStatus::Miss => "computed",
    }
}
