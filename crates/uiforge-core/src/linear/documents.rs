// Deterministic documents for the scaffold pipeline: PRD, Prisma schema, API routes

use crate::markup::title_case;

const MODULE_KEYWORDS: [(&str, &str); 9] = [
    ("patient", "Patients"),
    ("appointment", "Appointments"),
    ("invoice", "Billing"),
    ("doctor", "Doctors"),
    ("task", "Tasks"),
    ("inventory", "Inventory"),
    ("project", "Projects"),
    ("ticket", "Support Tickets"),
    ("dashboard", "Reporting"),
];

/// Functional modules mentioned in a brief, always led by Dashboard
pub fn infer_modules(prompt: &str) -> Vec<String> {
    let lower = prompt.to_lowercase();
    let mut modules: Vec<String> = MODULE_KEYWORDS
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, name)| name.to_string())
        .collect();

    if modules.is_empty() {
        return vec![
            "Dashboard".to_string(),
            "Records".to_string(),
            "Settings".to_string(),
        ];
    }
    if !modules.iter().any(|m| m == "Dashboard") {
        modules.insert(0, "Dashboard".to_string());
    }
    modules
}

/// Title from the first sentence of the brief
pub fn prd_title(prompt: &str) -> String {
    let first = prompt
        .split(&['.', '!', '?', '\n'][..])
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Generated App");
    title_case(first)
}

/// PRD markdown for a brief, with a reviewer section when feedback is pending
pub fn generate_prd(prompt: &str, feedback: Option<&str>) -> String {
    let modules = infer_modules(prompt);
    let module_lines = modules
        .iter()
        .map(|m| format!("- {}", m))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prd = format!(
        "# {title}\n\n\
         ## Overview\n\
         - Requested: {prompt}\n\
         - Modules detected: {modules}\n\
         - Goals: faster day-to-day workflows, responsive UX, built-in reporting\n\n\
         ## Modules\n\
         {module_lines}\n\n\
         ## Personas\n\
         - Operator: works through records every day\n\
         - Manager: reviews metrics and signs off approvals\n\
         - Developer: owns integrations and automation\n\n\
         ## Non-Functional Requirements\n\
         - Authentication with role-based access, audit logging, responsive layout, instrumentation hooks\n",
        title = prd_title(prompt),
        prompt = prompt,
        modules = modules.join(", "),
        module_lines = module_lines,
    );

    if let Some(feedback) = feedback {
        prd.push_str(&format!(
            "\n## Reviewer Feedback\n- {}\n- This revision addresses the feedback above.\n",
            feedback
        ));
    }
    prd
}

const USER_MODEL: &str = "model User {\n  id        String   @id @default(cuid())\n  email     String   @unique\n  name      String?\n  role      String   @default(\"member\")\n  createdAt DateTime @default(now())\n}";

/// Prisma schema with a User model plus one model per inferred module (up to four)
pub fn generate_schema(prompt: &str) -> String {
    let modules = infer_modules(prompt)
        .iter()
        .take(4)
        .map(|module| {
            let singular = module.strip_suffix('s').unwrap_or(module);
            let name: String = title_case(singular).split_whitespace().collect();
            format!(
                "model {name} {{\n  id        String   @id @default(cuid())\n  name      String\n  createdAt DateTime @default(now())\n  updatedAt DateTime @updatedAt\n}}"
            )
        })
        .collect::<Vec<_>>();
    let models = std::iter::once(USER_MODEL.to_string())
        .chain(modules)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "// Inferred from brief\n// {prompt}\n\n\
         datasource db {{\n  provider = \"sqlite\"\n  url      = env(\"DATABASE_URL\")\n}}\n\n\
         generator client {{\n  provider = \"prisma-client-js\"\n}}\n\n\
         {models}\n",
        prompt = prompt.lines().next().unwrap_or_default(),
        models = models,
    )
}

/// Markdown listing CRUD routes per module
pub fn generate_api_routes(prompt: &str) -> String {
    let sections = infer_modules(prompt)
        .iter()
        .map(|module| {
            let slug = module.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
            format!(
                "## /api/{slug}\n- GET /api/{slug}\n- POST /api/{slug}\n- PATCH /api/{slug}/:id\n- DELETE /api/{slug}/:id"
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("# REST API Routes\n\n{}\n", sections)
}
