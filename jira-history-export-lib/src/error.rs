
error_chain!{
    errors {
        Interrupted {
            description("interrupted by the user")
            display("interrupted by the user")
        }
        UnknownIssue(t: String) {
            description("issue is not in the ticket store")
            display("issue is not in the ticket store: '{}'", t)
        }
        BadIssueKey(t: String) {
            description("malformed issue key")
            display("malformed issue key: '{}'", t)
        }
    }
    foreign_links {
        Io(::std::io::Error);
        Hyper(::hyper::Error);
        Uri(::hyper::error::UriError);
        NativeTls(::native_tls::Error);
        Json(::serde_json::Error);
        Chrono(::chrono::ParseError);
        Dialoguer(::dialoguer::Error);
        HbTemplate(::handlebars::TemplateError);
        HbRender(::handlebars::RenderError);
    }
}
