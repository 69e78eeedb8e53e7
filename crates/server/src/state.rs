//! Application State
//!
//! Shared state handed to every request handler, plus the production
//! backend factory that wires the HTTP service clients from settings.

use std::sync::Arc;

use datavoice_config::Settings;
use datavoice_core::AgentRegistry;
use datavoice_llm::{ChatModel, DeepSeekChat, LlmConfig};
use datavoice_pipeline::{
    BackendFactory, EnergyGateConfig, EnergyTurnDetector, HttpStt, HttpTts, SpeechSynthesizer,
    SpeechToText, SttConfig, TtsConfig, TurnDetector,
};
use datavoice_transport::{FrameSerializer, TransportEvent};
use tokio::sync::broadcast;

use crate::session::SessionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub agents: Arc<AgentRegistry>,
    pub sessions: Arc<SessionManager>,
    pub backends: Arc<dyn BackendFactory>,
    pub serializer: FrameSerializer,
    events: broadcast::Sender<TransportEvent>,
}

impl AppState {
    /// Production state: built-in personas and HTTP service backends.
    pub fn new(settings: Settings) -> Self {
        let backends = Arc::new(HttpBackendFactory::new(&settings));
        Self::with_backends(settings, datavoice_config::builtin_registry(), backends)
    }

    /// State with explicit backends, used by tests to script the services.
    pub fn with_backends(
        settings: Settings,
        agents: AgentRegistry,
        backends: Arc<dyn BackendFactory>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(settings.server.max_sessions));
        let (events, _) = broadcast::channel(64);
        Self {
            settings: Arc::new(settings),
            agents: Arc::new(agents),
            sessions,
            backends,
            serializer: FrameSerializer::default(),
            events,
        }
    }

    /// Subscribe to connection-lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    /// Publish a connection-lifecycle event. Best effort: without
    /// subscribers the event is dropped.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }
}

/// Backend factory wiring the HTTP service clients from settings.
///
/// The chat model is shared across sessions (the client is stateless); the
/// detector, recognizer and synthesizer are stateful and built per session.
pub struct HttpBackendFactory {
    turn: EnergyGateConfig,
    stt: SttConfig,
    tts: TtsConfig,
    model: Arc<DeepSeekChat>,
}

impl HttpBackendFactory {
    pub fn new(settings: &Settings) -> Self {
        Self {
            turn: EnergyGateConfig {
                speech_threshold: settings.turn.speech_threshold,
                hangover_ms: settings.turn.hangover_ms,
            },
            stt: SttConfig {
                endpoint: settings.stt.endpoint.clone(),
                api_key: settings.stt.api_key.clone(),
                language: settings.stt.language.clone(),
                model: settings.stt.model.clone(),
            },
            tts: TtsConfig {
                endpoint: settings.tts.endpoint.clone(),
                api_key: settings.tts.api_key.clone(),
                voice: settings.tts.voice.clone(),
                sample_rate: settings.tts.sample_rate,
            },
            model: Arc::new(DeepSeekChat::new(LlmConfig {
                base_url: settings.llm.base_url.clone(),
                api_key: settings.llm.api_key.clone(),
                model: settings.llm.model.clone(),
                temperature: settings.llm.temperature,
                max_tokens: settings.llm.max_tokens,
            })),
        }
    }
}

impl BackendFactory for HttpBackendFactory {
    fn turn_detector(&self) -> Box<dyn TurnDetector> {
        Box::new(EnergyTurnDetector::new(self.turn.clone()))
    }

    fn speech_to_text(&self) -> Box<dyn SpeechToText> {
        Box::new(HttpStt::new(self.stt.clone()))
    }

    fn synthesizer(&self, voice: Option<&str>) -> Box<dyn SpeechSynthesizer> {
        Box::new(HttpTts::new(self.tts.for_voice(voice)))
    }

    fn chat_model(&self) -> Arc<dyn ChatModel> {
        self.model.clone()
    }
}
