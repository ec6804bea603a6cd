use crate::job::{JobId, Speaker, Transcript};

struct SpeakerShare {
	name: &'static str,
	share: f64,
}

struct Template {
	text: &'static str,
	duration_secs: f64,
	speakers: &'static [SpeakerShare],
}

const TEMPLATES: [Template; 3] = [
	Template {
		text: "Host: Welcome to Comedy Hour, episode 245! I'm your host Dave Johnson.\n\
		       Guest1: And I'm Sarah Martinez, ready to share some laughs!\n\
		       Host: Today we're talking about the most ridiculous things that happened to us at the DMV.\n\
		       Guest2: Oh boy, do I have some stories about that!\n\
		       Guest1: My DMV story starts with me waiting in line for what felt like three years...\n\
		       Guest2: Only three? Lucky you! [Laughter]\n\
		       Host: The DMV is where time goes to die, everyone knows that! [More laughter]\n\
		       Guest1: I finally reached the counter and realized I brought my cat's vaccination records instead of my ID.",
		duration_secs: 1800.0,
		speakers: &[
			SpeakerShare { name: "Dave Johnson", share: 0.40 },
			SpeakerShare { name: "Sarah Martinez", share: 0.35 },
			SpeakerShare { name: "Mike Wilson", share: 0.25 },
		],
	},
	Template {
		text: "Chairperson: Good morning everyone, let's begin our Q3 planning meeting.\n\
		       Manager1: I've prepared the sales projections as requested.\n\
		       Analyst: Based on our Q2 performance, we're seeing a 15% increase in customer acquisition.\n\
		       Manager2: That aligns with our marketing campaign results.\n\
		       Manager1: In the first month of Q2 organic traffic grew 12%.\n\
		       Analyst: And our conversion rate improved from 2.8% to 3.5%.\n\
		       Manager2: The new landing page design seems to be driving better engagement.\n\
		       Chairperson: These are encouraging results. Let's discuss how we can build on this momentum.",
		duration_secs: 3600.0,
		speakers: &[
			SpeakerShare { name: "Jennifer Chen", share: 0.35 },
			SpeakerShare { name: "Robert Clark", share: 0.25 },
			SpeakerShare { name: "Emily Wong", share: 0.25 },
			SpeakerShare { name: "Michael Brown", share: 0.15 },
		],
	},
	Template {
		text: "Professor: Welcome to Advanced Mathematics 301. Today we're covering eigenvalues and eigenvectors.\n\
		       Student1: Could you explain how this relates to linear transformations?\n\
		       Professor: Think of eigenvectors as special vectors that don't change direction when transformed.\n\
		       Student2: So they only scale up or down?\n\
		       Professor: Precisely! And the eigenvalue is that scaling factor. Let's look at a concrete example.\n\
		       Student3: Could you write that equation again?\n\
		       Student1: Oh, now I see how it connects to our previous lesson!\n\
		       Professor: Exactly! This is why eigenvalues are so crucial in so many applications.",
		duration_secs: 2700.0,
		speakers: &[
			SpeakerShare { name: "Dr. Smith", share: 0.70 },
			SpeakerShare { name: "Alex Turner", share: 0.15 },
			SpeakerShare { name: "Maria Garcia", share: 0.10 },
			SpeakerShare { name: "James Lee", share: 0.05 },
		],
	},
];

/// Builds a canned transcript for `job_id`. The same id always yields the same template.
#[must_use]
pub fn transcript_for(job_id: JobId, url: &str) -> Transcript {
	let index = usize::try_from(job_id.as_uuid().as_u128() % TEMPLATES.len() as u128).unwrap_or(0);
	let template = &TEMPLATES[index];

	let speakers = template
		.speakers
		.iter()
		.enumerate()
		.map(|(i, speaker)| Speaker {
			id: format!("speaker_{}", i + 1),
			name: Some(speaker.name.to_string()),
			speaking_time_secs: template.duration_secs * speaker.share,
		})
		.collect();

	Transcript {
		job_id,
		url: url.to_string(),
		duration_secs: template.duration_secs,
		text: template.text.to_string(),
		speakers,
		language: "en".to_string(),
	}
}
