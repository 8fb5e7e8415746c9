use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use shared::types::{
    ChangeOperation, Process, Schedule, ScheduleChange, Shift, ShiftChange, TeamMember,
};

use crate::domain::classifier::classify_utc;
use crate::domain::context::ChangeContext;
use crate::error::RenderError;

pub const FALLBACK_UNAVAILABLE: &str = "No disponible";
pub const FALLBACK_NA: &str = "N/A";
pub const FALLBACK_UNNAMED: &str = "Sin nombre";
pub const FALLBACK_NO_COMMENTS: &str = "Sin comentarios";
pub const NO_MEMBERS_MESSAGE: &str = "No hay miembros asignados a este equipo.";
pub const NO_SHIFTS_MESSAGE: &str = "No hay turnos registrados para este cuadro.";

const MULTIPROCESS_CATEGORY: &str = "multiproceso";
const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";
/// Stored hours within this distance of the computed value are not reported.
const HOURS_TOLERANCE: f64 = 0.01;
const MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Everything the change report is built from. `generated_at` comes from the
/// caller's clock so equal inputs render byte-identical output.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub schedule: Option<&'a Schedule>,
    pub members: &'a [TeamMember],
    pub shifts: &'a [Shift],
    pub schedule_history: &'a [ScheduleChange],
    pub shift_history: &'a [ShiftChange],
    pub processes: &'a [Process],
    pub operation: &'a ChangeOperation,
    pub generated_at: DateTime<Utc>,
    /// Zone used for every timestamp shown and for journey classification.
    pub timezone: Tz,
}

impl<'a> ReportInput<'a> {
    pub fn from_context(
        context: &'a ChangeContext,
        operation: &'a ChangeOperation,
        generated_at: DateTime<Utc>,
        timezone: Tz,
    ) -> Self {
        Self {
            schedule: context.schedule.as_ref(),
            members: &context.members,
            shifts: &context.shifts,
            schedule_history: &context.schedule_history,
            shift_history: &context.shift_history,
            processes: &context.processes,
            operation,
            generated_at,
            timezone,
        }
    }
}

/// Renders the HTML change report.
///
/// Only a missing schedule is an error; every other absent value degrades to
/// one of the fallback literals above.
pub fn render_change_report(input: &ReportInput<'_>) -> Result<String, RenderError> {
    let schedule = input
        .schedule
        .ok_or(RenderError::MissingSchedule(input.operation.target_id))?;

    Ok(ChangeReport { input, schedule }.to_string())
}

struct ChangeReport<'r, 'a> {
    input: &'r ReportInput<'a>,
    schedule: &'a Schedule,
}

impl fmt::Display for ChangeReport<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(
            "<!DOCTYPE html><html><body style=\"font-family:Arial,sans-serif;color:#333\">",
        )?;
        self.header(f)?;
        self.summary(f)?;
        self.processes(f)?;
        self.members(f)?;
        self.shifts(f)?;
        self.schedule_history(f)?;
        self.shift_history(f)?;
        self.footer(f)?;
        f.write_str("</body></html>")
    }
}

impl ChangeReport<'_, '_> {
    fn header(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation = self.input.operation;
        write!(
            f,
            "<section id=\"header\"><h2>{}</h2><p>{}</p></section>",
            escape_html(operation.kind.label()),
            text(Some(operation.description.as_str()), FALLBACK_UNAVAILABLE),
        )
    }

    fn summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.schedule;
        let exception = match s.has_exception {
            Some(true) => "Sí",
            Some(false) => "No",
            None => FALLBACK_UNAVAILABLE,
        };

        f.write_str("<section id=\"summary\"><h3>Cuadro de turno</h3><ul>")?;
        item(f, "Nombre", &text(s.name.as_deref(), FALLBACK_UNNAMED))?;
        item(f, "Versión", &text(s.version.as_deref(), FALLBACK_NA))?;
        item(f, "Categoría", &text(s.category.as_deref(), FALLBACK_UNAVAILABLE))?;
        item(f, "Periodo", &period(s.month, s.year))?;
        item(f, "Estado", &text(s.status.as_deref(), FALLBACK_UNAVAILABLE))?;
        item(f, "Excepción", exception)?;
        f.write_str("</ul></section>")
    }

    fn processes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.schedule;
        let is_multiprocess = s
            .category
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(MULTIPROCESS_CATEGORY));

        if is_multiprocess {
            if self.input.processes.is_empty() {
                return Ok(());
            }
            f.write_str("<section id=\"processes\"><h3>Procesos</h3>")?;
            table_head(f, &["Proceso", "Detalle", "Estado"])?;
            for p in self.input.processes {
                row(
                    f,
                    &[
                        text(p.name.as_deref(), FALLBACK_UNNAMED),
                        text(p.detail.as_deref(), FALLBACK_UNAVAILABLE),
                        if p.active { "Activo" } else { "Inactivo" }.to_string(),
                    ],
                )?;
            }
            return f.write_str("</tbody></table></section>");
        }

        let levels = [
            ("Macroproceso", s.macroprocess.as_deref()),
            ("Proceso", s.process.as_deref()),
            ("Servicio", s.service.as_deref()),
            ("Sección", s.section.as_deref()),
            ("Subsección", s.subsection.as_deref()),
        ];

        f.write_str("<section id=\"process\"><h3>Proceso</h3>")?;
        let mut any = false;
        for (label, value) in levels {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                if !any {
                    f.write_str("<ul>")?;
                    any = true;
                }
                item(f, label, &escape_html(value.trim()))?;
            }
        }
        if any {
            f.write_str("</ul>")?;
        } else {
            write!(f, "<p>{FALLBACK_UNAVAILABLE}</p>")?;
        }
        f.write_str("</section>")
    }

    fn members(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<section id=\"members\"><h3>Miembros del equipo</h3>")?;
        if self.input.members.is_empty() {
            write!(f, "<p>{NO_MEMBERS_MESSAGE}</p>")?;
            return f.write_str("</section>");
        }

        table_head(f, &["Nombre", "Documento", "Perfiles"])?;
        for m in self.input.members {
            let profiles: Vec<&str> = m
                .profiles
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect();
            let profiles = if profiles.is_empty() {
                FALLBACK_UNAVAILABLE.to_string()
            } else {
                escape_html(&profiles.join(", "))
            };
            row(
                f,
                &[
                    text(m.name.as_deref(), FALLBACK_UNNAMED),
                    text(m.document.as_deref(), FALLBACK_NA),
                    profiles,
                ],
            )?;
        }
        f.write_str("</tbody></table></section>")
    }

    fn shifts(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<section id=\"shifts\"><h3>Turnos</h3>")?;
        if self.input.shifts.is_empty() {
            write!(f, "<p>{NO_SHIFTS_MESSAGE}</p>")?;
            return f.write_str("</section>");
        }

        let tz = self.input.timezone;
        table_head(
            f,
            &[
                "Inicio",
                "Fin",
                "Tipo",
                "Jornada",
                "Horas",
                "Estado",
                "Comentarios",
            ],
        )?;
        for shift in self.input.shifts {
            let classification = classify_utc(shift.start, shift.end, tz);
            if let Some(stored) = shift.journey
                && stored != classification.journey
            {
                tracing::warn!(
                    shift_id = %shift.id,
                    stored = %stored,
                    computed = %classification.journey,
                    "Stored journey diverges from computed journey"
                );
            }
            if let Some(stored) = shift.total_hours
                && hours_diverge(stored, classification.duration_hours)
            {
                tracing::warn!(
                    shift_id = %shift.id,
                    stored,
                    computed = classification.duration_hours,
                    "Stored total hours diverge from computed duration"
                );
            }
            row(
                f,
                &[
                    timestamp(shift.start, tz),
                    timestamp(shift.end, tz),
                    text(shift.shift_type.as_deref(), FALLBACK_NA),
                    classification.journey.label().to_string(),
                    format_hours(classification.duration_hours),
                    text(shift.status.as_deref(), FALLBACK_UNAVAILABLE),
                    text(shift.comments.as_deref(), FALLBACK_NO_COMMENTS),
                ],
            )?;
        }
        f.write_str("</tbody></table></section>")
    }

    fn schedule_history(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let history = self.input.schedule_history;
        if history.is_empty() {
            return Ok(());
        }

        let tz = self.input.timezone;
        f.write_str("<section id=\"schedule-history\"><h3>Historial del cuadro</h3>")?;
        table_head(
            f,
            &["Fecha", "Usuario", "Acción", "Campo", "Anterior", "Nuevo"],
        )?;
        for change in history {
            row(
                f,
                &[
                    timestamp(change.changed_at, tz),
                    text(change.user.as_deref(), FALLBACK_UNAVAILABLE),
                    text(change.action.as_deref(), FALLBACK_NA),
                    text(change.field.as_deref(), FALLBACK_NA),
                    text(change.old_value.as_deref(), FALLBACK_NA),
                    text(change.new_value.as_deref(), FALLBACK_NA),
                ],
            )?;
        }
        f.write_str("</tbody></table></section>")
    }

    fn shift_history(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let history = self.input.shift_history;
        if history.is_empty() {
            return Ok(());
        }

        let tz = self.input.timezone;
        f.write_str("<section id=\"shift-history\"><h3>Historial de turnos</h3>")?;
        table_head(
            f,
            &[
                "Turno", "Fecha", "Usuario", "Acción", "Campo", "Anterior", "Nuevo",
            ],
        )?;
        for change in history {
            row(
                f,
                &[
                    change.shift_id.to_string(),
                    timestamp(change.changed_at, tz),
                    text(change.user.as_deref(), FALLBACK_UNAVAILABLE),
                    text(change.action.as_deref(), FALLBACK_NA),
                    text(change.field.as_deref(), FALLBACK_NA),
                    text(change.old_value.as_deref(), FALLBACK_NA),
                    text(change.new_value.as_deref(), FALLBACK_NA),
                ],
            )?;
        }
        f.write_str("</tbody></table></section>")
    }

    fn footer(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<footer><hr><p style=\"font-size:12px;color:#777\">Mensaje generado automáticamente \
             por el sistema de gestión de turnos el {}. Por favor no responda a este correo.</p></footer>",
            timestamp(self.input.generated_at, self.input.timezone),
        )
    }
}

fn item(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    write!(f, "<li><strong>{label}:</strong> {value}</li>")
}

fn table_head(f: &mut fmt::Formatter<'_>, columns: &[&str]) -> fmt::Result {
    f.write_str("<table border=\"1\" cellpadding=\"4\" style=\"border-collapse:collapse\"><thead><tr>")?;
    for column in columns {
        write!(f, "<th>{column}</th>")?;
    }
    f.write_str("</tr></thead><tbody>")
}

/// Cells must already be escaped.
fn row(f: &mut fmt::Formatter<'_>, cells: &[String]) -> fmt::Result {
    f.write_str("<tr>")?;
    for cell in cells {
        write!(f, "<td>{cell}</td>")?;
    }
    f.write_str("</tr>")
}

/// Escaped value, or `fallback` when absent or blank.
fn text(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => escape_html(v),
        None => fallback.to_string(),
    }
}

fn period(month: Option<u32>, year: Option<i32>) -> String {
    match (month, year) {
        (Some(m @ 1..=12), Some(y)) => format!("{} {y}", MONTHS[m as usize - 1]),
        _ => FALLBACK_UNAVAILABLE.to_string(),
    }
}

fn timestamp(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format(DATE_TIME_FORMAT).to_string()
}

fn hours_diverge(stored: f64, computed: f64) -> bool {
    (stored - computed).abs() > HOURS_TOLERANCE
}

/// `8.0` → `8`, `7.50` → `7.5`, `7.33` → `7.33`.
fn format_hours(hours: f64) -> String {
    let formatted = format!("{hours:.2}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Subject line shared by every message of one dispatch.
pub fn subject_for(operation: &ChangeOperation, schedule: Option<&Schedule>) -> String {
    let name = schedule
        .and_then(|s| s.name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_UNNAMED);
    format!("[{}] Cuadro de turno: {name}", operation.kind.label())
}
