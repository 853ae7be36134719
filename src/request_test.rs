use super::*;

fn url(value: &str) -> Url {
    Url::parse(value).expect("valid test url")
}

mod new {
    use super::*;

    #[test]
    fn should_default_to_get_without_body() {
        // Arrange & Act
        let request = Request::new(url("http://www.test.com/success.html"));

        // Assert
        assert_eq!(request.method(), "GET");
        assert!(request.body().is_none());
        assert!(request.headers().is_empty());
        assert_eq!(request.context(), RequestContext::Unspecified);
        assert!(request.include_credentials());
    }
}

mod prepared {
    use super::*;

    #[test]
    fn should_add_default_accept_given_none_set() {
        let request = Request::get(url("http://a.test/")).prepared();

        assert_eq!(request.headers().get("accept"), Some("*/*"));
    }

    #[test]
    fn should_use_event_stream_accept_given_event_source_context() {
        let request = Request::get(url("http://a.test/"))
            .with_context(RequestContext::EventSource)
            .prepared();

        assert_eq!(request.headers().get("Accept"), Some("text/event-stream"));
    }

    #[test]
    fn should_keep_caller_accept_given_one_set() {
        let request = Request::get(url("http://a.test/"))
            .with_header("Accept", "application/json")
            .prepared();

        assert_eq!(request.headers().get_all("Accept"), ["application/json"]);
    }
}

mod redirected {
    use super::*;

    #[test]
    fn should_keep_method_and_body_given_307() {
        // Arrange
        let request = Request::post(url("http://a.test/form")).with_body("a=1");

        // Act
        let next = request.redirected(url("http://a.test/next"), 307, HeaderList::new());

        // Assert
        assert_eq!(next.method(), "POST");
        assert_eq!(next.body(), Some(&b"a=1"[..]));
        assert_eq!(next.url().as_str(), "http://a.test/next");
    }

    #[test]
    fn should_turn_post_into_get_given_302() {
        // Arrange
        let request = Request::post(url("http://a.test/form")).with_body("a=1");
        let headers: HeaderList = [("Content-Type", "text/plain"), ("X-Keep", "1")]
            .into_iter()
            .collect();

        // Act
        let next = request.redirected(url("http://a.test/next"), 302, headers);

        // Assert
        assert_eq!(next.method(), "GET");
        assert!(next.body().is_none());
        assert!(!next.headers().contains("Content-Type"));
        assert!(next.headers().contains("X-Keep"));
    }

    #[test]
    fn should_turn_put_into_get_given_303() {
        let request = Request::new(url("http://a.test/")).with_method("PUT");

        let next = request.redirected(url("http://a.test/next"), 303, HeaderList::new());

        assert_eq!(next.method(), "GET");
    }

    #[test]
    fn should_keep_put_given_301() {
        let request = Request::new(url("http://a.test/")).with_method("PUT");

        let next = request.redirected(url("http://a.test/next"), 301, HeaderList::new());

        assert_eq!(next.method(), "PUT");
    }

    #[test]
    fn should_keep_head_given_303() {
        let request = Request::new(url("http://a.test/")).with_method("HEAD");

        let next = request.redirected(url("http://a.test/next"), 303, HeaderList::new());

        assert_eq!(next.method(), "HEAD");
    }

    #[test]
    fn should_replace_headers_with_supplied_set() {
        let request = Request::get(url("http://a.test/")).with_header("Origin", "http://a.test");

        let next = request.redirected(url("http://b.test/"), 302, HeaderList::new());

        assert!(next.headers().is_empty());
        assert_eq!(next.context(), request.context());
    }
}
