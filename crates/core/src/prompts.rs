pub const EXTRACT_JOBS_PROMPT: &str = r#"### SCRAPED TEXT FROM WEBSITE:
{page_data}

### INSTRUCTION:
The scraped text is from the careers page of a website.
Your job is to extract the job postings and return them in JSON format containing the
following keys: `role`, `experience`, `skills` and `description`.
`skills` must be a list of strings.
Only return the valid JSON.

### VALID JSON (NO PREAMBLE):"#;

pub const WRITE_MAIL_PROMPT: &str = r#"### JOB DESCRIPTION:
{job_description}

### INSTRUCTION:
You are {sender_name}, a business development executive at {company}. {company} is a software
consulting company that helps businesses automate and scale their processes with tailored
engineering work.
Your job is to write a cold email to the client regarding the job mentioned above, describing
how {company} can fulfil their needs.
Also add the most relevant ones from the following links to showcase {company}'s portfolio:
{link_list}
Remember you are {sender_name}, BDE at {company}.
Do not provide a preamble.

### EMAIL (NO PREAMBLE):
"#;
