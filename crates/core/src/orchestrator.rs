use crate::cleaner::clean_text;
use crate::error::PipelineError;
use crate::models::{flatten_links, JobPosting, LinkMetadata, SeedOutcome};
use crate::portfolio::PortfolioStore;
use crate::traits::{LlmChain, PageFetcher};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct GeneratedMail {
    pub job: JobPosting,
    pub links: Vec<LinkMetadata>,
    pub body: String,
}

/// Result of one user submission: either every email, or a single error message.
#[derive(Debug, Clone)]
pub enum Submission {
    Mails(Vec<GeneratedMail>),
    Failed(String),
}

impl Submission {
    pub fn render(&self) -> String {
        match self {
            Self::Mails(mails) if mails.is_empty() => "No job postings found on this page.".to_string(),
            Self::Mails(mails) => mails
                .iter()
                .map(|mail| format!("```markdown\n{}\n```", mail.body))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Self::Failed(message) => message.clone(),
        }
    }
}

/// Fetch, clean, extract, match and draft for one URL at a time.
pub struct ColdMailPipeline<F, L>
where
    F: PageFetcher,
    L: LlmChain,
{
    fetcher: F,
    llm: L,
    portfolio: PortfolioStore,
}

impl<F, L> ColdMailPipeline<F, L>
where
    F: PageFetcher + Send + Sync,
    L: LlmChain + Send + Sync,
{
    pub fn new(fetcher: F, llm: L, portfolio: PortfolioStore) -> Self {
        Self {
            fetcher,
            llm,
            portfolio,
        }
    }

    pub fn portfolio(&self) -> &PortfolioStore {
        &self.portfolio
    }

    pub async fn generate(&mut self, url: &str) -> Result<Vec<GeneratedMail>, PipelineError> {
        let page = self.fetcher.fetch(url).await?;
        let cleaned = clean_text(&page);
        if cleaned.is_empty() {
            return Err(PipelineError::EmptyPage(url.to_string()));
        }

        if self.portfolio.seed() == SeedOutcome::Unavailable {
            warn!("portfolio store unavailable, emails will not cite portfolio links");
        }

        let jobs = self.llm.extract_jobs(&cleaned).await?;
        info!(url, jobs = jobs.len(), "jobs extracted");

        let mut mails = Vec::with_capacity(jobs.len());
        for job in jobs {
            let links = flatten_links(&self.portfolio.query(job.skills.as_slice()));
            let body = self.llm.write_mail(&job, &links).await?;
            info!(role = %job.role, links = links.len(), "drafted email");
            mails.push(GeneratedMail { job, links, body });
        }

        Ok(mails)
    }

    /// Runs `generate`, collapsing any failure into one user-facing message.
    pub async fn submit(&mut self, url: &str) -> Submission {
        match self.generate(url).await {
            Ok(mails) => Submission::Mails(mails),
            Err(error) => {
                warn!(url, error = %error, "submission failed");
                Submission::Failed(format!("An Error Occurred: {error}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::{FetchError, LlmError, StoreError, StoreInitError};
    use crate::models::{ClientMode, PortfolioRow};
    use crate::stores::InMemoryCollection;
    use async_trait::async_trait;

    struct FakeFetcher {
        page: Result<String, u16>,
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.page.clone().map_err(|status| FetchError::Status {
                url: url.to_string(),
                status,
            })
        }
    }

    #[derive(Default)]
    struct FakeLlm {
        jobs: Vec<JobPosting>,
        fail_mail_for: Option<String>,
    }

    #[async_trait]
    impl LlmChain for FakeLlm {
        async fn extract_jobs(&self, page_text: &str) -> Result<Vec<JobPosting>, LlmError> {
            assert!(!page_text.contains('<'), "page text should be cleaned");
            Ok(self.jobs.clone())
        }

        async fn write_mail(&self, job: &JobPosting, links: &[LinkMetadata]) -> Result<String, LlmError> {
            if self.fail_mail_for.as_deref() == Some(job.role.as_str()) {
                return Err(LlmError::EmptyContent);
            }
            Ok(format!(
                "Dear hiring manager, re: {} ({} portfolio links)",
                job.role,
                links.len()
            ))
        }
    }

    fn rows() -> Vec<PortfolioRow> {
        vec![
            PortfolioRow {
                techstack: "Python, Django".to_string(),
                link: "github.com/x/django-app".to_string(),
            },
            PortfolioRow {
                techstack: "React, Node".to_string(),
                link: "github.com/x/react-app".to_string(),
            },
        ]
    }

    fn ready_store() -> PortfolioStore {
        let collection =
            InMemoryCollection::ephemeral("portfolio", "test-model", CharacterNgramEmbedder::default());
        PortfolioStore::with_collection(rows(), Box::new(collection), ClientMode::InMemory, 2)
    }

    fn job(role: &str, skills: &[&str]) -> JobPosting {
        JobPosting {
            role: role.to_string(),
            experience: "3 years".to_string(),
            skills: skills.iter().map(|skill| skill.to_string()).collect(),
            description: "Build things".to_string(),
        }
    }

    const PAGE: &str = "<html><body><h1>Careers</h1><p>Python developer wanted</p></body></html>";

    #[tokio::test]
    async fn drafts_one_email_per_job_with_matched_links() {
        let llm = FakeLlm {
            jobs: vec![job("Python Developer", &["Python"]), job("Frontend", &["React"])],
            ..FakeLlm::default()
        };
        let fetcher = FakeFetcher {
            page: Ok(PAGE.to_string()),
        };
        let mut pipeline = ColdMailPipeline::new(fetcher, llm, ready_store());

        let mails = pipeline
            .generate("https://jobs.example.com")
            .await
            .expect("pipeline should succeed");

        assert_eq!(mails.len(), 2);
        assert_eq!(mails[0].links[0].links, "github.com/x/django-app");
        assert_eq!(mails[1].links[0].links, "github.com/x/react-app");
        assert_eq!(pipeline.portfolio().status().entries, 2);

        let rendered = Submission::Mails(mails).render();
        assert_eq!(rendered.matches("```markdown").count(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_yields_exactly_one_error_message() {
        let llm = FakeLlm {
            jobs: vec![job("Python Developer", &["Python"])],
            ..FakeLlm::default()
        };
        let fetcher = FakeFetcher { page: Err(503) };
        let mut pipeline = ColdMailPipeline::new(fetcher, llm, ready_store());

        let submission = pipeline.submit("https://jobs.example.com").await;
        match submission {
            Submission::Failed(message) => {
                assert!(message.starts_with("An Error Occurred:"));
                assert!(message.contains("503"));
                assert_eq!(message.lines().count(), 1);
            }
            Submission::Mails(_) => panic!("fetch failure must not produce emails"),
        }
    }

    #[tokio::test]
    async fn failing_draft_discards_earlier_emails() {
        let llm = FakeLlm {
            jobs: vec![job("First", &["Python"]), job("Second", &["React"])],
            fail_mail_for: Some("Second".to_string()),
            ..FakeLlm::default()
        };
        let fetcher = FakeFetcher {
            page: Ok(PAGE.to_string()),
        };
        let mut pipeline = ColdMailPipeline::new(fetcher, llm, ready_store());

        let submission = pipeline.submit("https://jobs.example.com").await;
        assert!(matches!(submission, Submission::Failed(_)));

        // the next submission on the same pipeline still runs
        let again = pipeline.submit("https://jobs.example.com").await;
        assert!(matches!(again, Submission::Failed(_)));
    }

    #[tokio::test]
    async fn unavailable_store_still_drafts_without_links() {
        let llm = FakeLlm {
            jobs: vec![job("Python Developer", &["Python"])],
            ..FakeLlm::default()
        };
        let fetcher = FakeFetcher {
            page: Ok(PAGE.to_string()),
        };
        let store = PortfolioStore::unavailable(
            rows(),
            StoreInitError {
                attempts: 3,
                source: StoreError::ModelLoad {
                    model: "test-model".to_string(),
                    details: "checksum mismatch".to_string(),
                },
            },
        );
        let mut pipeline = ColdMailPipeline::new(fetcher, llm, store);

        let mails = pipeline
            .generate("https://jobs.example.com")
            .await
            .expect("pipeline should degrade, not fail");
        assert_eq!(mails.len(), 1);
        assert!(mails[0].links.is_empty());
    }

    #[tokio::test]
    async fn blank_page_is_reported() {
        let fetcher = FakeFetcher {
            page: Ok("<script>var x = 1;</script>   ".to_string()),
        };
        let mut pipeline = ColdMailPipeline::new(fetcher, FakeLlm::default(), ready_store());

        let result = pipeline.generate("https://jobs.example.com").await;
        assert!(matches!(result, Err(PipelineError::EmptyPage(_))));
    }

    #[test]
    fn empty_submission_renders_a_notice() {
        assert_eq!(
            Submission::Mails(Vec::new()).render(),
            "No job postings found on this page."
        );
    }
}
