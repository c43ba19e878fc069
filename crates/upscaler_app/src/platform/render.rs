use upscaler_core::{AppViewModel, EnhancedView, JobCardView, Screen, StatusBadge};

/// Terminal lines for a view model, top to bottom.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    match &view.screen {
        Screen::SignedOut => lines.push("Signed out".to_string()),
        Screen::SignedIn(signed_in) => {
            let user = &signed_in.user;
            lines.push(format!(
                "Signed in as {} <{}> ({})",
                display_name(&user.name),
                user.email,
                user.verification
            ));
            if let Some(selected) = &signed_in.selected {
                lines.push(format!("Selected: {} ({} bytes)", selected.name, selected.size));
            }
            if signed_in.uploading {
                lines.push("Uploading...".to_string());
            }
            if let Some(job) = &signed_in.job {
                render_job(job, &mut lines);
            }
        }
    }
    if let Some(notice) = &view.notice {
        lines.push(format!("Notice: {notice}"));
    }
    lines
}

fn render_job(job: &JobCardView, lines: &mut Vec<String>) {
    let badge = match job.badge {
        StatusBadge::Processing => "processing",
        StatusBadge::Completed => "completed",
        StatusBadge::Failed => "failed",
    };
    lines.push(format!("Job: {badge}"));
    if let Some((stage, percent)) = &job.progress {
        lines.push(format!("  {stage} {percent}%"));
    }
    if let Some(comparison) = &job.comparison {
        lines.push(format!(
            "  Original preview: {} chars",
            comparison.original_preview.len()
        ));
        lines.push(format!("  Enhanced: {}", comparison.enhanced_url));
        lines.push(match &comparison.enhanced {
            EnhancedView::Loading => "  Loading enhanced image...".to_string(),
            EnhancedView::Retrying { attempt, max } => {
                format!("  Retrying enhanced image ({attempt}/{max})")
            }
            EnhancedView::Loaded { bytes } => format!("  Enhanced image loaded ({bytes} bytes)"),
            EnhancedView::Failed { placeholder } => format!("  {placeholder}"),
        });
    }
    if job.downloading {
        lines.push("  Downloading...".to_string());
    }
    if let Some(path) = &job.saved_to {
        lines.push(format!("  Saved to {path}"));
    }
    if let Some(error) = &job.error_line {
        lines.push(format!("  {error}"));
    }
}

fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        "(no name)"
    } else {
        name
    }
}
