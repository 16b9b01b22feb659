mod enforcer_tests;
